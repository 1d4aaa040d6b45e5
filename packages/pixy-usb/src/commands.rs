//! Typed wrappers around the camera's procedures.
//!
//! Each method is a single [`Pixy::command`] or [`Pixy::call`] with a fixed
//! procedure name and argument shape.

use chirp::Value;

use crate::{connection::Pixy, error::PixyError};

/// Firmware version reported by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Servo channel of the RC servo outputs.
pub type ServoAxis = u8;

fn unexpected(procedure: &str, reason: &'static str) -> PixyError {
    PixyError::UnexpectedResponse {
        procedure: procedure.to_string(),
        reason,
    }
}

impl Pixy {
    /// Sets the RGB LED color.
    pub async fn led_set_rgb(&self, red: u8, green: u8, blue: u8) -> Result<i32, PixyError> {
        let color = blue as u32 | (green as u32) << 8 | (red as u32) << 16;
        self.command("led_set", vec![Value::U32(color)]).await
    }

    /// Limits the LED current, in microamps.
    pub async fn led_set_max_current(&self, current: u32) -> Result<i32, PixyError> {
        self.command("led_setMaxCurrent", vec![Value::U32(current)])
            .await
    }

    pub async fn led_get_max_current(&self) -> Result<i32, PixyError> {
        self.command("led_getMaxCurrent", Vec::new()).await
    }

    pub async fn cam_set_auto_white_balance(&self, enable: u8) -> Result<i32, PixyError> {
        self.command("cam_setAWB", vec![Value::U8(enable)]).await
    }

    pub async fn cam_get_auto_white_balance(&self) -> Result<i32, PixyError> {
        self.command("cam_getAWB", Vec::new()).await
    }

    pub async fn cam_set_white_balance_value(
        &self,
        red: u8,
        green: u8,
        blue: u8,
    ) -> Result<i32, PixyError> {
        let wbv = green as u32 | (red as u32) << 8 | (blue as u32) << 16;
        self.command("cam_setWBV", vec![Value::U32(wbv)]).await
    }

    /// Returns the white balance as `green | red << 8 | blue << 16`.
    pub async fn cam_get_white_balance_value(&self) -> Result<u32, PixyError> {
        let values = self.call("cam_getWBV", Vec::new()).await?;
        values
            .first()
            .and_then(Value::as_u32)
            .ok_or_else(|| unexpected("cam_getWBV", "expected an integer result"))
    }

    pub async fn cam_set_auto_exposure_compensation(&self, enable: u8) -> Result<i32, PixyError> {
        self.command("cam_setAEC", vec![Value::U8(enable)]).await
    }

    pub async fn cam_get_auto_exposure_compensation(&self) -> Result<i32, PixyError> {
        self.command("cam_getAEC", Vec::new()).await
    }

    pub async fn cam_set_exposure_compensation(
        &self,
        gain: u8,
        compensation: u16,
    ) -> Result<i32, PixyError> {
        let ecv = gain as u32 | (compensation as u32) << 8;
        self.command("cam_setECV", vec![Value::U32(ecv)]).await
    }

    /// Returns `(gain, compensation)`.
    pub async fn cam_get_exposure_compensation(&self) -> Result<(u8, u16), PixyError> {
        let values = self.call("cam_getECV", Vec::new()).await?;
        let ecv = values
            .first()
            .and_then(Value::as_u32)
            .ok_or_else(|| unexpected("cam_getECV", "expected an integer result"))?;

        Ok((ecv as u8, (ecv >> 8) as u16))
    }

    pub async fn cam_set_brightness(&self, brightness: u8) -> Result<i32, PixyError> {
        self.command("cam_setBrightness", vec![Value::U8(brightness)])
            .await
    }

    pub async fn cam_get_brightness(&self) -> Result<i32, PixyError> {
        self.command("cam_getBrightness", Vec::new()).await
    }

    pub async fn cam_get_position(&self, axis: ServoAxis) -> Result<i32, PixyError> {
        self.command("rcs_getPos", vec![Value::U8(axis)]).await
    }

    pub async fn rcs_set_position(&self, axis: ServoAxis, position: u16) -> Result<i32, PixyError> {
        self.command("rcs_setPos", vec![Value::U8(axis), Value::U16(position)])
            .await
    }

    /// Sets the servo PWM frequency in hertz.
    pub async fn rcs_set_frequency(&self, frequency: u16) -> Result<i32, PixyError> {
        self.command("rcs_setFreq", vec![Value::U16(frequency)])
            .await
    }

    pub async fn get_firmware_version(&self) -> Result<FirmwareVersion, PixyError> {
        let values = self.call("version", Vec::new()).await?;

        let parts = values
            .iter()
            .find_map(Value::as_nested)
            .ok_or_else(|| unexpected("version", "expected a nested version triple"))?;

        match parts {
            [Value::U16(major), Value::U16(minor), Value::U16(build), ..] => Ok(FirmwareVersion {
                major: *major,
                minor: *minor,
                build: *build,
            }),
            _ => Err(unexpected("version", "expected three u16 version parts")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FirmwareVersion;

    #[test]
    fn version_display_and_order() {
        let old = FirmwareVersion {
            major: 1,
            minor: 0,
            build: 9,
        };
        let new = FirmwareVersion {
            major: 2,
            minor: 0,
            build: 1,
        };

        assert_eq!(new.to_string(), "2.0.1");
        assert!(old < new);
    }
}
