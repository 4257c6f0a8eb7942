use std::path::{Path, PathBuf};

use crate::gl_compiler::{compile_shader, link_program, GlDriver, GlHandle};
use crate::{process_file, translate_error_log, IncludeProvider, ProgramError, ShaderFile, Staleness};

/// Pipeline stage a shader file is compiled for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// The matching `GL_*_SHADER` enum
    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => 0x8B31,
            ShaderStage::TessControl => 0x8E88,
            ShaderStage::TessEvaluation => 0x8E87,
            ShaderStage::Geometry => 0x8DD9,
            ShaderStage::Fragment => 0x8B30,
            ShaderStage::Compute => 0x91B9,
        }
    }

    /// Infers the stage from extensions such as `.vert` or `.vs.glsl`.
    /// A name made of the extension alone (`vert`, `vs.glsl`) has no stage.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        let name = name.strip_suffix(".glsl").unwrap_or(&name);
        let (stem, extension) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }

        match extension {
            "vert" | "vs" => Some(ShaderStage::Vertex),
            "tesc" | "tcs" => Some(ShaderStage::TessControl),
            "tese" | "tes" => Some(ShaderStage::TessEvaluation),
            "geom" | "gs" => Some(ShaderStage::Geometry),
            "frag" | "fs" => Some(ShaderStage::Fragment),
            "comp" | "cs" => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramState {
    Uncompiled,
    Compiling,
    Linked,
    /// The last build failed. A previously linked program, if any, is still in use.
    CompileFailed,
}

/// What `ShaderProgram::reload_if_stale` did this time around
#[derive(Debug)]
pub enum ReloadOutcome {
    NotStale,
    Reloaded,
    /// Rebuild failed; the previous program stays bound
    Failed(ProgramError),
    /// Timestamps of some file can't be read, so the program is no longer watched
    Disabled,
}

struct StageSource {
    stage: ShaderStage,
    path: PathBuf,
    file: Option<ShaderFile>,
}

/// A GL program built from one top-level file per stage, rebuilt in place when any of
/// its files change on disk.
pub struct ShaderProgram {
    stages: Vec<StageSource>,
    handle: Option<GlHandle>,
    state: ProgramState,
    hot_reload: bool,
}

impl ShaderProgram {
    pub fn new<I, P>(stages: I) -> Self
    where
        I: IntoIterator<Item = (ShaderStage, P)>,
        P: Into<PathBuf>,
    {
        Self {
            stages: stages
                .into_iter()
                .map(|(stage, path)| StageSource {
                    stage,
                    path: path.into(),
                    file: None,
                })
                .collect(),
            handle: None,
            state: ProgramState::Uncompiled,
            hot_reload: true,
        }
    }

    /// Like `new`, with each stage inferred by `ShaderStage::from_path`.
    pub fn from_paths<I, P>(paths: I) -> Result<Self, ProgramError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let stages = paths
            .into_iter()
            .map(|path| {
                let path: PathBuf = path.into();
                match ShaderStage::from_path(&path) {
                    Some(stage) => Ok((stage, path)),
                    None => Err(ProgramError::UnknownStage {
                        file: path.display().to_string(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(stages))
    }

    pub fn handle(&self) -> Option<GlHandle> {
        self.handle
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn is_hot_reload_enabled(&self) -> bool {
        self.hot_reload
    }

    /// Resolved sources of the last build attempt, in stage order
    pub fn shader_files(&self) -> impl Iterator<Item = (ShaderStage, &ShaderFile)> {
        self.stages
            .iter()
            .filter_map(|s| s.file.as_ref().map(|file| (s.stage, file)))
    }

    /// Resolves, compiles and links every stage.
    ///
    /// On success the new program replaces (and deletes) the previous one. On failure the
    /// previous program is kept and the error carries the translated compiler log.
    pub fn build(
        &mut self,
        include_provider: &mut dyn IncludeProvider,
        driver: &mut dyn GlDriver,
    ) -> Result<(), ProgramError> {
        self.state = ProgramState::Compiling;

        let result = match self.resolve_sources(include_provider) {
            Ok(files) => {
                let linked = self.compile_and_link(driver, &files);
                // Staleness is judged against the last attempt, linked or not
                for (stage, file) in self.stages.iter_mut().zip(files) {
                    stage.file = Some(file);
                }
                linked
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(program) => {
                if let Some(previous) = self.handle.replace(program) {
                    driver.delete_program(previous);
                }
                self.state = ProgramState::Linked;
                Ok(())
            }
            Err(err) => {
                log::error!("{}", err);
                self.state = ProgramState::CompileFailed;
                Err(err)
            }
        }
    }

    /// Rebuilds the program if any file of any stage changed since the last build.
    /// Meant to be called once per frame.
    ///
    /// Stages whose top-level file failed to load are watched by path: once all of them
    /// can be stat'ed again, the program is rebuilt. An `Uncompiled` program is left
    /// alone until the first `build`.
    pub fn reload_if_stale(
        &mut self,
        include_provider: &mut dyn IncludeProvider,
        driver: &mut dyn GlDriver,
    ) -> ReloadOutcome {
        if !self.hot_reload {
            return ReloadOutcome::Disabled;
        }

        if self.state == ProgramState::Uncompiled {
            return ReloadOutcome::NotStale;
        }

        let mut changed = self.reappeared_stage(&*include_provider);
        if changed.is_none() {
            for file in self.stages.iter().filter_map(|s| s.file.as_ref()) {
                match file.staleness(&*include_provider) {
                    Staleness::Fresh => {}
                    Staleness::Stale { path } => {
                        changed = Some(path);
                        break;
                    }
                    Staleness::Unavailable { path } => {
                        log::warn!(
                            "disabling hot reload of {}: cannot read modification time of {}",
                            file.filename.display(),
                            path.display()
                        );
                        self.hot_reload = false;
                        return ReloadOutcome::Disabled;
                    }
                }
            }
        }

        let changed = match changed {
            Some(path) => path,
            None => return ReloadOutcome::NotStale,
        };

        log::info!("{} changed, reloading shader program", changed.display());
        match self.build(include_provider, driver) {
            Ok(()) => ReloadOutcome::Reloaded,
            Err(err) => ReloadOutcome::Failed(err),
        }
    }

    /// Deletes the GL program, if one was linked.
    pub fn destroy(mut self, driver: &mut dyn GlDriver) {
        if let Some(handle) = self.handle.take() {
            driver.delete_program(handle);
        }
    }

    /// Path of a stage that never resolved, if every such stage's file now exists.
    fn reappeared_stage(&self, include_provider: &dyn IncludeProvider) -> Option<PathBuf> {
        let mut waiting = self.stages.iter().filter(|s| s.file.is_none()).peekable();
        let first = waiting.peek()?.path.clone();

        let all_back = waiting.all(|s| {
            let resolved = include_provider.resolve_root(&s.path);
            include_provider.last_write(&resolved).is_ok()
        });

        if all_back {
            Some(first)
        } else {
            None
        }
    }

    fn resolve_sources(
        &self,
        include_provider: &mut dyn IncludeProvider,
    ) -> Result<Vec<ShaderFile>, ProgramError> {
        self.stages
            .iter()
            .map(|s| process_file(&s.path, include_provider).map_err(ProgramError::from))
            .collect()
    }

    fn compile_and_link(
        &self,
        driver: &mut dyn GlDriver,
        files: &[ShaderFile],
    ) -> Result<GlHandle, ProgramError> {
        let mut shaders = Vec::with_capacity(files.len());

        for (source, file) in self.stages.iter().zip(files) {
            let output = compile_shader(driver, source.stage, &file.source_string);

            if let Some(log) = output.log {
                for shader in shaders {
                    driver.delete_shader(shader);
                }
                return Err(ProgramError::Compile {
                    stage: source.stage,
                    log: translate_error_log(file, &log),
                });
            }

            match output.artifact {
                Some(shader) => shaders.push(shader),
                None => log::warn!("{} is empty; stage skipped", file.filename.display()),
            }
        }

        if shaders.is_empty() {
            return Err(ProgramError::Link {
                log: "no shader stage has any source".to_string(),
            });
        }

        let program = driver.create_program();
        for &shader in &shaders {
            driver.attach_shader(program, shader);
        }

        let link_log = link_program(driver, program);

        for &shader in &shaders {
            driver.detach_shader(program, shader);
            driver.delete_shader(shader);
        }

        match link_log {
            Some(log) => {
                driver.delete_program(program);
                Err(ProgramError::Link { log })
            }
            None => Ok(program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_from_extension() {
        let stage = |p: &str| ShaderStage::from_path(Path::new(p));

        assert_eq!(stage("shaders/blit.vert"), Some(ShaderStage::Vertex));
        assert_eq!(stage("shaders/blit.vs.glsl"), Some(ShaderStage::Vertex));
        assert_eq!(stage("shaders/Blit.FRAG"), Some(ShaderStage::Fragment));
        assert_eq!(stage("shaders/blit.fs.glsl"), Some(ShaderStage::Fragment));
        assert_eq!(stage("grass.geom"), Some(ShaderStage::Geometry));
        assert_eq!(stage("terrain.tesc"), Some(ShaderStage::TessControl));
        assert_eq!(stage("terrain.tese"), Some(ShaderStage::TessEvaluation));
        assert_eq!(stage("cull.comp"), Some(ShaderStage::Compute));
        assert_eq!(stage("common.glsl"), None);
        assert_eq!(stage("noextension"), None);
        assert_eq!(stage("vert"), None);
        assert_eq!(stage("vs.glsl"), None);
        assert_eq!(stage(".frag"), None);
        assert_eq!(stage("shaders/vert"), None);
    }

    #[test]
    fn from_paths_rejects_unknown_stage() {
        assert!(ShaderProgram::from_paths(vec!["a.vert", "a.frag"]).is_ok());
        match ShaderProgram::from_paths(vec!["a.vert", "common.glsl"]) {
            Err(ProgramError::UnknownStage { file }) => assert_eq!(file, "common.glsl"),
            _ => panic!(),
        }
    }
}
