use models::{CommonParams, FirmwareRange, Permission};

/// Per-call metadata. The dispatcher builds the defaults, the method's
/// factory overrides them during init, and it is read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub required_permissions: Vec<Permission>,
    pub use_device: bool,
    pub use_ui: bool,
    pub firmware_range: FirmwareRange,
    /// Operation label shown to the user.
    pub info: String,
    /// The method may run on a device in bootloader mode.
    pub allow_bootloader: bool,
    /// The method can only run on a device in bootloader mode.
    pub require_bootloader: bool,
    /// The method may run on a device without a seed.
    pub allow_seedless: bool,
    pub common: CommonParams,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, common: CommonParams) -> Self {
        Self {
            name: name.into(),
            required_permissions: Vec::new(),
            use_device: true,
            use_ui: true,
            firmware_range: FirmwareRange::default(),
            info: String::new(),
            allow_bootloader: false,
            require_bootloader: false,
            allow_seedless: false,
            common,
        }
    }

    pub fn device_path(&self) -> Option<&str> {
        self.common.device.as_ref().map(|d| d.path.as_str())
    }

    pub fn needs_permissions(&self) -> bool {
        !self.required_permissions.is_empty()
    }
}
