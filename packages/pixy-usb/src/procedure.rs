//! Resolution of procedure names to the ids the camera assigned them.

use std::collections::HashMap;

use chirp::{Value, INVALID_PROCEDURE_ID};
use log::{debug, warn};

use crate::error::PixyError;

/// Procedures resolved on every connection.
pub const BUILTIN_PROCEDURES: &[&str] = &[
    "led_set",
    "led_setMaxCurrent",
    "led_getMaxCurrent",
    "cam_setAWB",
    "cam_getAWB",
    "cam_setWBV",
    "cam_getWBV",
    "cam_setAEC",
    "cam_getAEC",
    "cam_setECV",
    "cam_getECV",
    "cam_setBrightness",
    "cam_getBrightness",
    "rcs_getPos",
    "rcs_setPos",
    "rcs_setFreq",
    "version",
];

/// Name to id mapping negotiated when a connection opens.
///
/// The table never changes after negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureTable {
    ids: HashMap<String, u16>,
}

impl ProcedureTable {
    /// Arguments of the `GET_PROCEDURE` call resolving `names`.
    pub fn request<S: AsRef<str>>(names: &[S]) -> Vec<Value> {
        vec![Value::Nested(
            names.iter().map(|name| Value::from(name.as_ref())).collect(),
        )]
    }

    /// Builds the table from the response to [`ProcedureTable::request`].
    ///
    /// Names the camera answered with [`INVALID_PROCEDURE_ID`] are left out.
    pub fn from_response<S: AsRef<str>>(names: &[S], response: &[Value]) -> Result<Self, PixyError> {
        let unexpected = |reason| PixyError::UnexpectedResponse {
            procedure: "GET_PROCEDURE".to_string(),
            reason,
        };

        let ids = response
            .first()
            .and_then(Value::as_nested)
            .ok_or_else(|| unexpected("expected a nested list of ids"))?;

        if ids.len() != names.len() {
            return Err(unexpected("id count does not match name count"));
        }

        let mut table = HashMap::with_capacity(names.len());
        for (name, id) in names.iter().zip(ids) {
            let name = name.as_ref();
            let Value::U16(id) = *id else {
                return Err(unexpected("procedure id is not a u16"));
            };

            if id == INVALID_PROCEDURE_ID {
                warn!("Pixy does not implement procedure {:?}", name);
                continue;
            }

            debug!("Resolved procedure {:?} to id {}", name, id);
            table.insert(name.to_string(), id);
        }

        Ok(Self { ids: table })
    }

    /// Looks up the id of `name`.
    pub fn id(&self, name: &str) -> Result<u16, PixyError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| PixyError::ProcedureNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }
}
