//! Loading principal snapshots and record sets from JSON files.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::authz::Principal;
use crate::errors::{AuthzError, AuthzResult};
use crate::models::Record;

pub fn load_principal(path: impl AsRef<Path>) -> AuthzResult<Principal> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| AuthzError::io(path, err))?;
    decode(path, &text)
}

/// Records file holding either one object or an array of objects.
pub fn load_records(path: impl AsRef<Path>) -> AuthzResult<Vec<Record>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Record>),
        One(Record),
    }

    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| AuthzError::io(path, err))?;
    Ok(match decode::<OneOrMany>(path, &text)? {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![record],
    })
}

pub fn decode<T: DeserializeOwned>(origin: &Path, text: &str) -> AuthzResult<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| AuthzError::decode(origin, err))
}
