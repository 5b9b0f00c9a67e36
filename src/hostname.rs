use tracing::warn;

/// Hostname used when the OS lookup fails.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// Source of the `hostname` envelope field when no `hostname` attribute
/// is configured.
pub trait HostnameResolver: Send + Sync {
    fn hostname(&self) -> String;
}

/// Resolves the local machine's hostname through the OS.
#[derive(Clone, Debug, Default)]
pub struct SystemHostname;

impl HostnameResolver for SystemHostname {
    fn hostname(&self) -> String {
        match ::hostname::get() {
            Ok(name) => match name.into_string() {
                Ok(name) if !name.is_empty() => name,
                _ => {
                    warn!("system hostname is empty or not valid UTF-8");
                    UNKNOWN_HOSTNAME.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to resolve system hostname");
                UNKNOWN_HOSTNAME.to_string()
            }
        }
    }
}

/// Always returns the same hostname.
#[derive(Clone, Debug)]
pub struct FixedHostname(pub String);

impl FixedHostname {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self(hostname.into())
    }
}

impl HostnameResolver for FixedHostname {
    fn hostname(&self) -> String {
        self.0.clone()
    }
}
