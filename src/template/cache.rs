// ABOUTME: In-memory template cache and a loader for precompiled JSON templates.
// ABOUTME: The cache lives for one invocation so each module compiles once.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Template, TemplateCompiler, TemplateError};

/// Caches compiled templates by module path.
#[derive(Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<PathBuf, Arc<Template>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached template or compile and remember it.
    pub async fn get_or_compile<C>(
        &self,
        compiler: &C,
        module_path: &Path,
    ) -> Result<Arc<Template>, TemplateError>
    where
        C: TemplateCompiler + ?Sized,
    {
        if let Some(hit) = self.entries.lock().get(module_path) {
            tracing::debug!(path = %module_path.display(), "template cache hit");
            return Ok(Arc::clone(hit));
        }

        let template = Arc::new(compiler.compile(module_path).await?);
        self.entries
            .lock()
            .insert(module_path.to_path_buf(), Arc::clone(&template));
        Ok(template)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Loads templates that were already compiled to ARM-style JSON.
///
/// A module path `infra/main` resolves to `infra/main.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTemplateLoader;

#[async_trait]
impl TemplateCompiler for JsonTemplateLoader {
    async fn compile(&self, module_path: &Path) -> Result<Template, TemplateError> {
        let path = if module_path.extension().is_some_and(|ext| ext == "json") {
            module_path.to_path_buf()
        } else {
            module_path.with_extension("json")
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::ModuleNotFound(path));
            }
            Err(e) => return Err(e.into()),
        };

        Template::from_arm_json(bytes).map_err(|e| TemplateError::Compile {
            path,
            message: e.to_string(),
        })
    }
}
