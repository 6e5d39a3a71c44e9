//! Door service messages

use serde::{Deserialize, Serialize};

pub mod method {
    pub const LOCK_DOOR: &str = "door.DoorService/LockDoor";
    pub const UNLOCK_DOOR: &str = "door.DoorService/UnlockDoor";
    pub const OPEN_DOOR: &str = "door.DoorService/OpenDoor";
    pub const GET_LOCK_STATUS: &str = "door.DoorService/GetLockStatus";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDoorRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDoorResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockDoorRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockDoorResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDoorRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDoorResponse {
    /// How long the door takes to open
    pub duration: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLockStatusRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLockStatusResponse {
    /// 0 = unlocked, 1 = locked
    pub status: i32,
}
