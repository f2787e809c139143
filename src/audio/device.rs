// Output device discovery - devices are addressed by their position in the enumeration
// Nothing is cached: every playback resolves its device fresh, -1 is the OS default

use crate::error::{Result, SoundError};

/// Reserved index meaning "the OS default render device"
pub const DEFAULT_DEVICE_INDEX: i32 = -1;

/// A render endpoint plus the name shown to the user.
#[derive(Debug, Clone)]
pub struct DeviceRef<D> {
    pub index: i32,
    pub name: String,
    pub handle: D,
}

/// Capability interface over the platform's audio subsystem.
pub trait DeviceProvider {
    type Device;

    /// Active output endpoints, in the order the host reports them.
    fn list_devices(&self) -> Result<Vec<DeviceRef<Self::Device>>>;

    /// The current OS default output, looked up on every call.
    fn default_device(&self) -> Result<DeviceRef<Self::Device>>;

    /// Map an index to a device.
    ///
    /// `-1` always goes through [`DeviceProvider::default_device`]; `0..len`
    /// picks from a fresh enumeration; anything else is `DeviceNotFound`.
    fn resolve(&self, index: i32) -> Result<DeviceRef<Self::Device>> {
        if index == DEFAULT_DEVICE_INDEX {
            return self.default_device();
        }

        let devices = self.list_devices()?;
        let available = devices.len();

        usize::try_from(index)
            .ok()
            .and_then(|i| devices.into_iter().nth(i))
            .ok_or(SoundError::DeviceNotFound { index, available })
    }
}

/// Lines for the device listing, sentinel first.
pub fn describe_devices<D>(devices: &[DeviceRef<D>]) -> Vec<String> {
    std::iter::once(format!("{}: Default Output", DEFAULT_DEVICE_INDEX))
        .chain(devices.iter().map(|d| format!("{}: {}", d.index, d.name)))
        .collect()
}
