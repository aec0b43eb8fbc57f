use serde::{Deserialize, Serialize};

use crate::model::device::Device;

#[derive(Debug, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}
