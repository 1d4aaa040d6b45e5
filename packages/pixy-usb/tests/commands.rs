mod common;

use common::{answer, connect};
use pixy_usb::{protocol::Value, FirmwareVersion, PixyConfig, PixyError};

#[tokio::test]
async fn setters_pack_their_arguments() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;
    let procedures = pixy.procedures().clone();

    let (result, call) = tokio::join!(
        pixy.led_set_rgb(0x11, 0x22, 0x33),
        answer(&mut device, vec![Value::I32(0)])
    );
    result.unwrap();
    assert_eq!(call.header.procedure, procedures.id("led_set").unwrap());
    assert_eq!(call.values, vec![Value::U32(0x11_22_33)]);

    let (result, call) = tokio::join!(
        pixy.cam_set_white_balance_value(0x01, 0x02, 0x03),
        answer(&mut device, vec![Value::I32(0)])
    );
    result.unwrap();
    assert_eq!(call.header.procedure, procedures.id("cam_setWBV").unwrap());
    assert_eq!(call.values, vec![Value::U32(0x03_01_02)]);

    let (result, call) = tokio::join!(
        pixy.cam_set_exposure_compensation(0x40, 0x1234),
        answer(&mut device, vec![Value::I32(0)])
    );
    result.unwrap();
    assert_eq!(call.values, vec![Value::U32(0x12_34_40)]);

    let (result, call) = tokio::join!(
        pixy.rcs_set_position(1, 500),
        answer(&mut device, vec![Value::I32(0)])
    );
    result.unwrap();
    assert_eq!(call.header.procedure, procedures.id("rcs_setPos").unwrap());
    assert_eq!(call.values, vec![Value::U8(1), Value::U16(500)]);

    let (result, call) = tokio::join!(
        pixy.rcs_set_frequency(60),
        answer(&mut device, vec![Value::I32(0)])
    );
    result.unwrap();
    assert_eq!(call.values, vec![Value::U16(60)]);

    pixy.close().await;
}

#[tokio::test]
async fn getters_unpack_their_results() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;

    let (result, call) = tokio::join!(
        pixy.cam_get_position(0),
        answer(&mut device, vec![Value::I32(512)])
    );
    assert_eq!(result.unwrap(), 512);
    assert_eq!(call.values, vec![Value::U8(0)]);

    let (result, _) = tokio::join!(
        pixy.cam_get_white_balance_value(),
        answer(&mut device, vec![Value::U32(0x00_80_40_20)])
    );
    assert_eq!(result.unwrap(), 0x00_80_40_20);

    let (result, _) = tokio::join!(
        pixy.cam_get_exposure_compensation(),
        answer(&mut device, vec![Value::U32(0x12_34_56)])
    );
    assert_eq!(result.unwrap(), (0x56, 0x1234));

    let (result, call) = tokio::join!(
        pixy.get_firmware_version(),
        answer(
            &mut device,
            vec![Value::Nested(vec![
                Value::U16(2),
                Value::U16(0),
                Value::U16(11)
            ])]
        )
    );
    assert!(call.values.is_empty());
    assert_eq!(
        result.unwrap(),
        FirmwareVersion {
            major: 2,
            minor: 0,
            build: 11
        }
    );

    pixy.close().await;
}

#[tokio::test]
async fn wrongly_shaped_results_are_rejected() {
    let (pixy, mut device) = connect(PixyConfig::default()).await;

    let (result, _) = tokio::join!(
        pixy.get_firmware_version(),
        answer(&mut device, vec![Value::I32(0)])
    );
    assert!(matches!(
        result,
        Err(PixyError::UnexpectedResponse { procedure, .. }) if procedure == "version"
    ));

    let (result, _) = tokio::join!(
        pixy.cam_get_brightness(),
        answer(&mut device, vec![Value::from("bright")])
    );
    assert!(matches!(result, Err(PixyError::UnexpectedResponse { .. })));

    pixy.close().await;
}
