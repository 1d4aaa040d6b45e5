#![allow(dead_code)]

use pixy_usb::{
    protocol::{Frame, Value, GET_PROCEDURE_ID, INVALID_PROCEDURE_ID},
    transport::memory::{self, MemoryDevice},
    Block, BlockKind, Pixy, PixyConfig,
};

/// Answers the host's procedure negotiation, numbering procedures from one in
/// request order and refusing the names in `unsupported`.
pub async fn negotiate(device: &mut MemoryDevice, unsupported: &[&str]) -> Frame {
    let call = device.next_frame().await.expect("host hung up");
    assert!(call.is_call());
    assert_eq!(call.header.procedure, GET_PROCEDURE_ID);

    let names = call.values[0].as_nested().expect("names are nested");
    let ids = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = std::str::from_utf8(name.as_bytes().unwrap()).unwrap();
            if unsupported.contains(&name) {
                Value::U16(INVALID_PROCEDURE_ID)
            } else {
                Value::U16(i as u16 + 1)
            }
        })
        .collect();

    device.reply(&call, vec![Value::Nested(ids)]).unwrap();
    call
}

/// Connects a [`Pixy`] to a simulated camera that implements every procedure.
pub async fn connect(config: PixyConfig) -> (Pixy, MemoryDevice) {
    connect_without(config, &[]).await
}

pub async fn connect_without(config: PixyConfig, unsupported: &[&str]) -> (Pixy, MemoryDevice) {
    let (transport, mut device) = memory::pair();

    let (pixy, _) = tokio::join!(
        Pixy::connect(transport, config),
        negotiate(&mut device, unsupported)
    );

    (pixy.unwrap(), device)
}

/// Waits for the next call and answers it with `values`.
pub async fn answer(device: &mut MemoryDevice, values: Vec<Value>) -> Frame {
    let call = device.next_frame().await.expect("host hung up");
    device.reply(&call, values).unwrap();
    call
}

pub fn block(signature: u16, x: u16) -> Block {
    Block {
        kind: BlockKind::Normal,
        signature,
        x,
        y: 100,
        width: 20,
        height: 10,
        angle: 0,
    }
}
