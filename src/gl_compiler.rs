//! Compiling and linking OpenGL shaders.
//!
//! The GL entry points are reached through the `GlDriver` trait, so this crate stays
//! independent of any particular binding generator. Failures hand back the driver's raw
//! info log; mapping it to source files is done separately with `translate_error_log`,
//! since only the caller knows which `ShaderFile` the log belongs to.
//!
//! An implementation on top of the `gl` crate looks roughly like this:
//!
//! ```ignore
//! impl GlDriver for GlContext {
//!     fn create_shader(&mut self, stage: ShaderStage) -> GlHandle {
//!         unsafe { gl::CreateShader(stage.gl_enum()) }
//!     }
//!
//!     fn compile_shader(&mut self, shader: GlHandle, source: &str) -> Result<(), String> {
//!         unsafe {
//!             let ptr = source.as_ptr() as *const gl::types::GLchar;
//!             let len = source.len() as gl::types::GLint;
//!             gl::ShaderSource(shader, 1, &ptr, &len);
//!             gl::CompileShader(shader);
//!
//!             let mut ok = 0;
//!             gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut ok);
//!             if ok == 1 { Ok(()) } else { Err(shader_info_log(shader)) }
//!         }
//!     }
//!
//!     // ...
//! }
//! ```

use crate::program::ShaderStage;

/// Name of a GL shader or program object
pub type GlHandle = u32;

/// The subset of OpenGL needed to build programs
pub trait GlDriver {
    fn create_shader(&mut self, stage: ShaderStage) -> GlHandle;

    /// Uploads `source` and compiles it; `Err` carries the info log
    fn compile_shader(&mut self, shader: GlHandle, source: &str) -> Result<(), String>;

    fn delete_shader(&mut self, shader: GlHandle);

    fn create_program(&mut self) -> GlHandle;

    fn attach_shader(&mut self, program: GlHandle, shader: GlHandle);

    fn detach_shader(&mut self, program: GlHandle, shader: GlHandle);

    /// Links `program`; `Err` carries the info log
    fn link_program(&mut self, program: GlHandle) -> Result<(), String>;

    fn delete_program(&mut self, program: GlHandle);
}

/// Output of OpenGL's shader compiler, along with an info log.
pub struct ShaderCompilerOutput<Artifact> {
    pub artifact: Artifact,
    pub log: Option<String>,
}

/// Compiles `source` into a new shader object.
///
/// Blank source is a successful no-op: no object is created and neither artifact nor log
/// is returned. On failure the shader object is deleted and the raw log is returned.
pub fn compile_shader(
    driver: &mut dyn GlDriver,
    stage: ShaderStage,
    source: &str,
) -> ShaderCompilerOutput<Option<GlHandle>> {
    if source.trim().is_empty() {
        return ShaderCompilerOutput {
            artifact: None,
            log: None,
        };
    }

    let handle = driver.create_shader(stage);
    match driver.compile_shader(handle, source) {
        Ok(()) => ShaderCompilerOutput {
            artifact: Some(handle),
            log: None,
        },
        Err(log) => {
            driver.delete_shader(handle);
            ShaderCompilerOutput {
                artifact: None,
                log: Some(log),
            }
        }
    }
}

/// Links `program`, returning the raw info log on failure.
pub fn link_program(driver: &mut dyn GlDriver, program: GlHandle) -> Option<String> {
    driver.link_program(program).err()
}
