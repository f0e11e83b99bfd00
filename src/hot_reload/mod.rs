//! Shader hot reload
//!
//! [`ShaderWatcher`] reports source files that changed on disk;
//! [`mark_changed`] flags the shaders built from them. Recompiling stays in
//! the caller's hands, typically once per frame:
//!
//! ```no_run
//! # use hearth_shader::{HeadlessBackend, ShaderConfig, ShaderContext};
//! # use hearth_shader::hot_reload::{mark_changed, ShaderWatcher};
//! # fn main() -> hearth_shader::ShaderResult<()> {
//! let ctx = ShaderContext::new(HeadlessBackend::new(), ShaderConfig::default());
//! let mut shader = ctx.load_shader("basic.json")?;
//! let mut watcher = ShaderWatcher::new(ctx.config().debounce_ms)?;
//! watcher.watch_dir(&ctx.config().source_root)?;
//!
//! let changed = watcher.poll_changed();
//! if mark_changed([&mut shader], &changed) > 0 {
//!     if let Err(e) = shader.recompile_if_needed() {
//!         log::error!("keeping broken shader until the next edit: {e}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod watcher;

pub use watcher::{Debouncer, ShaderWatcher};

use std::path::PathBuf;

use crate::backend::GraphicsBackend;
use crate::program::Shader;

/// Flag every shader built from one of `changed`; returns how many were
/// flagged
pub fn mark_changed<'a, B, I>(shaders: I, changed: &[PathBuf]) -> usize
where
    B: GraphicsBackend + 'a,
    I: IntoIterator<Item = &'a mut Shader<B>>,
{
    if changed.is_empty() {
        return 0;
    }
    shaders
        .into_iter()
        .map(|shader| shader.notify_changed(changed))
        .filter(|hit| *hit)
        .count()
}
