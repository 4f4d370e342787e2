use tracing::debug;

use crate::context::GpuContext;
use crate::device::Device;
use crate::error::{GpuError, Result};

/// Checks and activates every extension in `names`, in order.
///
/// Each unsupported name is reported separately so a single call surfaces
/// all of them; supported names are activated even when others are missing.
/// Activating an extension twice is a no-op. Fails with
/// [`GpuError::MissingCapability`] listing the missing names.
pub fn require_extensions<D, S>(ctx: &mut GpuContext<D>, names: &[S]) -> Result<()>
where
    D: Device,
    S: AsRef<str>,
{
    let supported = ctx.device().supported_extensions();
    let mut missing = Vec::new();

    for name in names {
        let name = name.as_ref();
        let available = supported.iter().any(|candidate| candidate == name);
        if available && ctx.activate_extension(name) {
            debug!(extension = name, "extension active");
            continue;
        }
        ctx.report_error(&format!("Missing required extension \"{name}\""));
        missing.push(name.to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else if ctx.is_context_lost() {
        Err(GpuError::ContextLost)
    } else {
        Err(GpuError::MissingCapability { missing })
    }
}
