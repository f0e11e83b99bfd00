//! Composition root of the shader layer

use std::path::Path;
use std::rc::Rc;

use crate::backend::GraphicsBackend;
use crate::config::ShaderConfig;
use crate::error::ShaderResult;
use crate::name::NameInterner;
use crate::program::Shader;

/// Owns what every shader shares: the graphics backend, the name interner and
/// the configuration.
///
/// Shaders keep their own reference to the backend, so a context may be
/// dropped before the shaders it loaded.
pub struct ShaderContext<B: GraphicsBackend> {
    backend: Rc<B>,
    names: NameInterner,
    config: ShaderConfig,
}

impl<B: GraphicsBackend> ShaderContext<B> {
    pub fn new(backend: B, config: ShaderConfig) -> Self {
        Self::with_shared_backend(Rc::new(backend), config)
    }

    /// Context over a backend the caller also uses elsewhere
    pub fn with_shared_backend(backend: Rc<B>, config: ShaderConfig) -> Self {
        log::debug!(
            "[shader] context created, source root {}",
            config.source_root.display()
        );
        Self {
            backend,
            names: NameInterner::new(),
            config,
        }
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    pub fn names(&self) -> &NameInterner {
        &self.names
    }

    pub fn config(&self) -> &ShaderConfig {
        &self.config
    }

    /// Load and compile the shader at `path`, relative to the source root
    pub fn load_shader(&self, path: impl AsRef<Path>) -> ShaderResult<Shader<B>> {
        Shader::new(self, path)
    }

    /// Watcher over the source root, or `None` when hot reload is disabled
    #[cfg(feature = "hot-reload")]
    pub fn source_watcher(&self) -> ShaderResult<Option<crate::hot_reload::ShaderWatcher>> {
        if !self.config.hot_reload {
            return Ok(None);
        }
        let mut watcher = crate::hot_reload::ShaderWatcher::new(self.config.debounce_ms)?;
        watcher.watch_dir(&self.config.source_root)?;
        Ok(Some(watcher))
    }
}
