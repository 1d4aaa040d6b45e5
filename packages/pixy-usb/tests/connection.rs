mod common;

use std::{sync::Arc, time::Duration};

use common::{answer, block, connect, connect_without, negotiate};
use pixy_usb::{
    block::encode_blocks,
    protocol::{Frame, Value},
    transport::memory,
    ErrorCode, Pixy, PixyConfig, PixyError, TransportError,
};

#[tokio::test]
async fn negotiation_skips_unimplemented_procedures() {
    let (pixy, mut device) =
        connect_without(PixyConfig::default().with_procedure("stop"), &["rcs_setFreq"]).await;

    let procedures = pixy.procedures();
    assert!(procedures.contains("cam_setBrightness"));
    assert!(procedures.contains("stop"));
    assert!(!procedures.contains("rcs_setFreq"));

    let err = pixy.rcs_set_frequency(50).await.unwrap_err();
    assert!(matches!(&err, PixyError::ProcedureNotFound(name) if name == "rcs_setFreq"));
    assert_eq!(err.code(), ErrorCode::InvalidParameter.code());
    assert_eq!(device.try_next_sent(), None);

    pixy.close().await;
}

#[tokio::test]
async fn negotiation_retries_after_timeout() {
    let (transport, mut device) = memory::pair();
    let config = PixyConfig::default()
        .with_call_timeout(Duration::from_millis(50))
        .with_handshake_retries(2);

    let device_side = async {
        // Ignore the first attempt.
        device.next_frame().await.unwrap();
        negotiate(&mut device, &[]).await;
    };

    let (pixy, ()) = tokio::join!(Pixy::connect(transport, config), device_side);
    let pixy = pixy.unwrap();
    assert!(pixy.is_connected());
    pixy.close().await;
}

#[tokio::test]
async fn negotiation_fails_when_device_is_gone() {
    let (transport, device) = memory::pair();
    drop(device);

    let err = Pixy::connect(transport, PixyConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PixyError::Transport(TransportError::NoDevice)));
    assert_eq!(err.code(), ErrorCode::NoDevice.code());
}

#[tokio::test]
async fn command_marshals_arguments_and_returns_result() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;
    let id = pixy.procedures().id("cam_setBrightness").unwrap();

    let device_side = async {
        let call = answer(&mut device, vec![Value::I32(0)]).await;
        assert_eq!(call.header.procedure, id);
        assert_eq!(call.values, vec![Value::U8(128)]);
    };

    let (result, ()) = tokio::join!(
        pixy.command("cam_setBrightness", vec![Value::U8(128)]),
        device_side
    );
    assert_eq!(result.unwrap(), 0);

    pixy.close().await;
}

#[tokio::test]
async fn command_without_results_returns_zero() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;

    let (result, _) = tokio::join!(
        pixy.command("cam_setAWB", vec![Value::U8(1)]),
        answer(&mut device, Vec::new())
    );
    assert_eq!(result.unwrap(), 0);

    pixy.close().await;
}

#[tokio::test]
async fn streamed_blocks_are_queued_and_diagnostics_dropped() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;
    assert!(!pixy.blocks_are_new());

    device
        .send_frame(&encode_blocks(&[block(1, 10), block(2, 20)]))
        .unwrap();
    device
        .send_frame(&Frame::data(vec![
            Value::U32(u32::from_le_bytes(*b"PRNT")),
            Value::from("hello"),
        ]))
        .unwrap();
    device.send_frame(&encode_blocks(&[block(3, 30)])).unwrap();

    // The listener handles reads in order, so once this call is answered the
    // frames above have been routed.
    let (result, _) = tokio::join!(
        pixy.cam_get_brightness(),
        answer(&mut device, vec![Value::I32(80)])
    );
    assert_eq!(result.unwrap(), 80);

    assert!(pixy.blocks_are_new());
    let blocks = pixy.get_blocks(10).unwrap();
    assert_eq!(
        blocks,
        vec![block(1, 10), block(2, 20), block(3, 30)]
    );
    assert!(!pixy.blocks_are_new());
    assert!(pixy.get_blocks(10).unwrap().is_empty());

    pixy.close().await;
}

#[tokio::test]
async fn overflowing_queue_keeps_the_newest_blocks() {
    let (pixy, mut device) = connect(PixyConfig::default().with_queue_capacity(3)).await;

    let pushed: Vec<_> = (0..5).map(|i| block(1, i)).collect();
    device.send_frame(&encode_blocks(&pushed)).unwrap();

    let (result, _) = tokio::join!(
        pixy.cam_get_brightness(),
        answer(&mut device, vec![Value::I32(0)])
    );
    result.unwrap();

    assert_eq!(pixy.get_blocks(5).unwrap(), pushed[2..]);
    assert_eq!(pixy.dropped_blocks(), 2);

    pixy.close().await;
}

#[tokio::test]
async fn malformed_frames_do_not_disturb_calls() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;

    let mut corrupt = encode_blocks(&[block(4, 4)]).to_bytes().unwrap();
    corrupt[9] ^= 0xFF;
    device.inject(corrupt).unwrap();
    device.inject(vec![0xC3, 0x00, 0x42]).unwrap();
    // A response nobody asked for.
    device
        .send_frame(&Frame::response(999, 1, vec![Value::I32(5)]))
        .unwrap();

    let (result, _) = tokio::join!(
        pixy.cam_get_auto_white_balance(),
        answer(&mut device, vec![Value::I32(1)])
    );
    assert_eq!(result.unwrap(), 1);
    assert!(pixy.get_blocks(10).unwrap().is_empty());

    pixy.close().await;
}

#[tokio::test]
async fn concurrent_calls_receive_their_own_responses() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;
    let pixy = Arc::new(pixy);

    let a = tokio::spawn({
        let pixy = pixy.clone();
        async move { pixy.cam_get_brightness().await }
    });
    let first = device.next_frame().await.unwrap();

    let b = tokio::spawn({
        let pixy = pixy.clone();
        async move { pixy.led_get_max_current().await }
    });
    let second = device.next_frame().await.unwrap();

    assert_ne!(first.header.seq, second.header.seq);

    device.reply(&second, vec![Value::I32(2)]).unwrap();
    device.reply(&first, vec![Value::I32(1)]).unwrap();

    assert_eq!(a.await.unwrap().unwrap(), 1);
    assert_eq!(b.await.unwrap().unwrap(), 2);

    pixy.close().await;
}

#[tokio::test]
async fn unanswered_call_times_out() {
    let (pixy, mut device) =
        connect(PixyConfig::default().with_call_timeout(Duration::from_millis(50))).await;

    let err = pixy.cam_get_brightness().await.unwrap_err();
    assert!(matches!(&err, PixyError::Timeout(name) if name == "cam_getBrightness"));
    assert_eq!(err.code(), ErrorCode::UsbIo.code());

    // A late response is dropped and later calls still work.
    let late = device.next_frame().await.unwrap();
    device.reply(&late, vec![Value::I32(7)]).unwrap();

    let (result, _) = tokio::join!(
        pixy.cam_get_brightness(),
        answer(&mut device, vec![Value::I32(8)])
    );
    assert_eq!(result.unwrap(), 8);

    pixy.close().await;
}

#[tokio::test]
async fn remote_failures_carry_their_code() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;

    let device_side = async {
        let call = device.next_frame().await.unwrap();
        device.reply_error(&call, -3).unwrap();
    };

    let (result, ()) = tokio::join!(pixy.led_set_max_current(500), device_side);
    let err = result.unwrap_err();
    assert!(matches!(err, PixyError::Remote(-3)));
    assert_eq!(err.code(), -3);

    pixy.close().await;
}

#[tokio::test]
async fn unplug_releases_pending_calls() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;

    device.send_frame(&encode_blocks(&[block(6, 1)])).unwrap();

    let device_side = async move {
        device.next_frame().await.unwrap();
        drop(device);
    };

    let (result, ()) = tokio::join!(pixy.cam_get_brightness(), device_side);
    assert!(matches!(
        result,
        Err(PixyError::Transport(TransportError::NoDevice))
    ));
    assert!(!pixy.is_connected());

    // Blocks that arrived before the unplug are still handed out.
    assert_eq!(pixy.get_blocks(10).unwrap(), vec![block(6, 1)]);
    assert!(matches!(
        pixy.get_blocks(10),
        Err(PixyError::Transport(TransportError::NoDevice))
    ));
    assert!(matches!(
        pixy.cam_get_brightness().await,
        Err(PixyError::Transport(TransportError::NoDevice))
    ));

    pixy.close().await;
}

#[tokio::test]
async fn close_releases_in_flight_calls() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;
    let pixy = Arc::new(pixy);

    let call = tokio::spawn({
        let pixy = pixy.clone();
        async move { pixy.cam_get_brightness().await }
    });
    device.next_frame().await.unwrap();

    pixy.close().await;

    assert!(matches!(
        call.await.unwrap(),
        Err(PixyError::Transport(TransportError::NoDevice))
    ));
}

#[tokio::test]
async fn operations_after_close_fail_without_io() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;

    pixy.close().await;
    pixy.close().await;

    assert!(matches!(
        pixy.command("cam_setBrightness", vec![Value::U8(1)]).await,
        Err(PixyError::NotConnected)
    ));
    assert!(matches!(pixy.get_blocks(1), Err(PixyError::NotConnected)));
    assert!(!pixy.is_connected());
    assert_eq!(device.try_next_sent(), None);
}
