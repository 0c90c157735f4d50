use gl::types::{GLint, GLuint};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whitespace-separated extension names to treat as missing.
pub const IGNORE_EXTENSIONS_VAR: &str = "OGL_IGNORE_EXTENSIONS";

/// Source of capability facts about the current GL implementation.
pub trait GlProbe {
    fn is_loaded(&self) -> bool;
    fn version(&self) -> Option<String>;
    fn extensions(&self) -> Vec<String>;
}

/// Probes the function table loaded through `gl::load_with`.
/// A context must be current when the probe runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlContextProbe;

unsafe fn gl_string(ptr: *const u8) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr as *const _).to_string_lossy().into_owned())
    }
}

impl GlProbe for GlContextProbe {
    fn is_loaded(&self) -> bool {
        gl::GetString::is_loaded()
    }

    fn version(&self) -> Option<String> {
        if !self.is_loaded() {
            return None;
        }
        unsafe { gl_string(gl::GetString(gl::VERSION)) }
    }

    fn extensions(&self) -> Vec<String> {
        if !self.is_loaded() {
            return Vec::new();
        }
        unsafe {
            if gl::GetStringi::is_loaded() {
                let mut count: GLint = 0;
                gl::GetIntegerv(gl::NUM_EXTENSIONS, &mut count);
                if count > 0 {
                    return (0..count as GLuint)
                        .filter_map(|i| gl_string(gl::GetStringi(gl::EXTENSIONS, i)))
                        .collect();
                }
            }
            // Legacy contexts only report the space-separated list
            gl_string(gl::GetString(gl::EXTENSIONS))
                .map(|list| list.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlCapabilities {
    present: bool,
    version: Option<String>,
    extensions: HashSet<String>,
    ignored: HashSet<String>,
}

impl GlCapabilities {
    pub fn from_probe<I>(probe: &dyn GlProbe, ignored: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        if !probe.is_loaded() {
            return Self::default();
        }
        Self {
            present: true,
            version: probe.version(),
            extensions: probe.extensions().into_iter().collect(),
            ignored: ignored.into_iter().collect(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Exact name match; ignored extensions always report false.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name) && !self.ignored.contains(name)
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }
}

static CAPABILITIES: OnceCell<GlCapabilities> = OnceCell::new();
static ACTIVE: AtomicBool = AtomicBool::new(false);

fn ignored_from_env() -> Vec<String> {
    std::env::var(IGNORE_EXTENSIONS_VAR)
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Snapshots the GL capabilities on first call; returns whether OpenGL is present.
pub fn initialize(probe: &dyn GlProbe) -> bool {
    CAPABILITIES
        .get_or_init(|| {
            let ignored = ignored_from_env();
            if !ignored.is_empty() {
                debug!("Ignoring extensions: {}", ignored.join(" "));
            }
            let caps = GlCapabilities::from_probe(probe, ignored);
            if caps.is_present() {
                info!(
                    "OpenGL {} with {} extensions",
                    caps.version().unwrap_or("(unknown version)"),
                    caps.extension_count()
                );
            } else {
                warn!("OpenGL is not available");
            }
            caps
        })
        .is_present()
}

pub fn is_present() -> bool {
    CAPABILITIES.get().map_or(false, GlCapabilities::is_present)
}

/// Whether rendering currently goes through OpenGL.
pub fn is_active() -> bool {
    is_present() && ACTIVE.load(Ordering::Acquire)
}

pub fn set_active(active: bool) {
    ACTIVE.store(active, Ordering::Release);
}

pub fn check_extension(name: &str) -> bool {
    CAPABILITIES.get().map_or(false, |caps| caps.has_extension(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeProbe {
        loaded: bool,
        extensions: Vec<&'static str>,
        calls: Cell<u32>,
    }

    impl FakeProbe {
        fn new(loaded: bool, extensions: Vec<&'static str>) -> Self {
            Self { loaded, extensions, calls: Cell::new(0) }
        }
    }

    impl GlProbe for FakeProbe {
        fn is_loaded(&self) -> bool {
            self.calls.set(self.calls.get() + 1);
            self.loaded
        }

        fn version(&self) -> Option<String> {
            Some("2.1 Fake".to_string())
        }

        fn extensions(&self) -> Vec<String> {
            self.extensions.iter().map(|s| s.to_string()).collect()
        }
    }

    #[test]
    fn test_snapshot_from_probe() {
        let probe = FakeProbe::new(true, vec!["GL_ARB_multisample", "GL_EXT_texture_filter_anisotropic"]);
        let caps = GlCapabilities::from_probe(&probe, vec!["GL_ARB_multisample".to_string()]);
        assert!(caps.is_present());
        assert_eq!(caps.version(), Some("2.1 Fake"));
        assert!(caps.has_extension("GL_EXT_texture_filter_anisotropic"));
        assert!(!caps.has_extension("GL_ARB_multisample"));
        assert!(!caps.has_extension("GL_EXT_texture"));
    }

    #[test]
    fn test_unloaded_probe_is_absent() {
        let probe = FakeProbe::new(false, vec!["GL_ARB_multisample"]);
        let caps = GlCapabilities::from_probe(&probe, Vec::new());
        assert!(!caps.is_present());
        assert!(!caps.has_extension("GL_ARB_multisample"));
    }

    #[test]
    fn test_global_queries_are_idempotent() {
        let first = FakeProbe::new(true, vec!["GL_ARB_texture_non_power_of_two"]);
        let present = initialize(&first);

        let second = FakeProbe::new(false, Vec::new());
        assert_eq!(initialize(&second), present);
        assert_eq!(second.calls.get(), 0);

        let ext = check_extension("GL_ARB_texture_non_power_of_two");
        for _ in 0..3 {
            assert_eq!(is_present(), present);
            assert_eq!(check_extension("GL_ARB_texture_non_power_of_two"), ext);
        }
        assert!(!check_extension("GL_ARB_texture_non_power"));
    }
}
