/// Handle to a running IPC server.
///
/// Dropping the handle does not stop the server; it runs until the process
/// exits.
#[derive(Debug, Clone)]
pub struct IpcServerHandle {
    port: u16,
    auth_token: String,
}

impl IpcServerHandle {
    pub(crate) fn new(port: u16, auth_token: String) -> Self {
        Self { port, auth_token }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Token clients must send in their first message.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn url(&self) -> String {
        format!("{}:{}", crate::CONNECT_IPC_BASE_URL, self.port)
    }
}
