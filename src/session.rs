use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::params::{self, NameInterner, ParameterTable, ParseWarning};

/// Turns shader source into a live program. `params` is the table that will
/// be published with the program if compilation succeeds.
pub trait ShaderCompiler {
    type Shader;

    fn compile(&mut self, source: &str, params: &ParameterTable) -> Result<Self::Shader, String>;
}

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8 text", path.display())]
    NotUtf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("shader compilation failed: {0}")]
    Compile(String),
}

/// Reads a shader file as text, keeping I/O and encoding failures apart.
pub fn read_shader(path: &Path) -> Result<String, ReloadError> {
    let bytes = std::fs::read(path).map_err(|source| ReloadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| ReloadError::NotUtf8 {
        path: path.to_path_buf(),
        source,
    })
}

/// What a successful reload changed.
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub parameters: usize,
    pub migrated: usize,
    pub evicted: Vec<Arc<str>>,
    pub warnings: Vec<ParseWarning>,
}

/// Owns the live shader and the parameter tables published with it.
///
/// Two tables ping-pong on every successful reload: the old `current`
/// becomes `previous` and supplies live values to same-named parameters of
/// the new pass.
pub struct ShaderSession<C: ShaderCompiler> {
    compiler: C,
    shader: Option<C::Shader>,
    current: ParameterTable,
    previous: ParameterTable,
    names: NameInterner,
    reloads: u64,
}

impl<C: ShaderCompiler> ShaderSession<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            shader: None,
            current: ParameterTable::new(),
            previous: ParameterTable::new(),
            names: NameInterner::default(),
            reloads: 0,
        }
    }

    pub fn shader(&self) -> Option<&C::Shader> {
        self.shader.as_ref()
    }

    pub fn current_parameters(&self) -> &ParameterTable {
        &self.current
    }

    pub fn current_parameters_mut(&mut self) -> &mut ParameterTable {
        &mut self.current
    }

    /// The live shader together with the table it was published with.
    pub fn active_mut(&mut self) -> Option<(&mut C::Shader, &mut ParameterTable)> {
        let shader = self.shader.as_mut()?;
        Some((shader, &mut self.current))
    }

    /// Number of reloads that took effect.
    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    pub fn reload_file(&mut self, path: &Path) -> Result<ReloadReport, ReloadError> {
        let source = read_shader(path)?;
        self.reload(&source)
    }

    /// Compiles `source` and, on success, publishes it with a freshly parsed
    /// table whose values are carried over by name from the previous one.
    /// On failure nothing changes.
    pub fn reload(&mut self, source: &str) -> Result<ReloadReport, ReloadError> {
        let mut parsed = params::parse_parameters(source);
        let shader = self
            .compiler
            .compile(source, &parsed.table)
            .map_err(ReloadError::Compile)?;

        std::mem::swap(&mut self.current, &mut self.previous);
        self.current.clear();

        let mut report = ReloadReport {
            warnings: parsed.warnings,
            ..Default::default()
        };
        for mut descriptor in parsed.table.drain() {
            descriptor.name = self.names.intern(&descriptor.name);
            if let Some(old) = self.previous.get(&descriptor.name) {
                descriptor.value = old.value;
                report.migrated += 1;
            }
            self.current.insert(descriptor);
        }
        report.parameters = self.current.len();
        report.evicted = self
            .previous
            .names()
            .filter(|name| !self.current.contains(name))
            .cloned()
            .collect();

        self.shader = Some(shader);
        self.reloads += 1;
        Ok(report)
    }
}
