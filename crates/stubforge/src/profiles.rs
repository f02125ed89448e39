//! Built-in module profiles for the stub targets.
//!
//! A profile bundles everything module-specific: the override tables fed
//! to the signature rewriter, the repair passes that run on the finished
//! stub, and files to delete from the package directory. The two built-in
//! targets are OpenImageIO and PyOpenColorIO.

use stubforge_core::overrides::SigOverrides;
use stubforge_core::repair::RepairPass;

/// Replacement for parameters that accept a float vector as either a
/// scalar or any iterable.
const FLOAT_VECTOR_ARG: &str = "float | typing.Iterable[float]";

/// ImageBufAlgo parameters that take float vectors but are inferred as
/// bare `object`.
const FLOAT_VECTOR_PARAMS: &[&str] = &[
    "min",
    "max",
    "black",
    "white",
    "sthresh",
    "scontrast",
    "white_balance",
    "values",
    "top",
    "bottom",
    "topleft",
    "topright",
    "bottomleft",
    "bottomright",
    "color",
];

/// Internal wrapper stubs deleted from every finished package.
const CLEANUP_FILES: &[&str] = &["_tool_wrapper.pyi"];

// ============================================================================
// Module Profile
// ============================================================================

/// Everything module-specific about one stub target.
#[derive(Debug, Clone)]
pub struct ModuleProfile {
    /// Importable module name, also the package directory name.
    pub module: String,
    /// Override tables applied while rewriting signatures.
    pub overrides: SigOverrides,
    /// Repair passes run on the finished stub, in order.
    pub repair_passes: Vec<RepairPass>,
    /// File names deleted from the package directory after repair.
    pub cleanup_files: Vec<String>,
}

/// All built-in profiles, in generation order.
pub fn builtin_profiles() -> Vec<ModuleProfile> {
    vec![openimageio_profile(), pyopencolorio_profile()]
}

/// Profile for the OpenImageIO bindings.
pub fn openimageio_profile() -> ModuleProfile {
    ModuleProfile {
        module: "OpenImageIO".to_string(),
        overrides: openimageio_overrides(),
        repair_passes: vec![
            RepairPass::BufferImport,
            RepairPass::RedundantOverloads,
            RepairPass::DefaultOrder,
        ],
        cleanup_files: cleanup_files(),
    }
}

/// Profile for the PyOpenColorIO bindings.
pub fn pyopencolorio_profile() -> ModuleProfile {
    ModuleProfile {
        module: "PyOpenColorIO".to_string(),
        overrides: pyopencolorio_overrides(),
        repair_passes: vec![
            RepairPass::BufferImport,
            RepairPass::ExceptionCycle,
            RepairPass::DefaultOrder,
        ],
        cleanup_files: cleanup_files(),
    }
}

fn cleanup_files() -> Vec<String> {
    CLEANUP_FILES.iter().map(|f| f.to_string()).collect()
}

// ============================================================================
// Override Tables
// ============================================================================

fn openimageio_overrides() -> SigOverrides {
    let mut overrides = SigOverrides::new()
        // These special methods are inferred with many inaccurate overloads.
        .signature("*.__ne__", "(self, other: object) -> bool")
        .signature("*.__eq__", "(self, other: object) -> bool")
        // pybind11 buffers surface as numpy arrays at runtime.
        .param_type("*", "*", "Buffer", "numpy.ndarray");
    // Float-vector parameters accept a scalar or any iterable of floats.
    for &name in FLOAT_VECTOR_PARAMS {
        overrides = overrides.param_type("*.ImageBufAlgo.*", name, "object", FLOAT_VECTOR_ARG);
    }
    overrides
        // BASETYPE and str convert implicitly to TypeDesc.
        .param_type("*", "*", "*.TypeDesc", "Union[TypeDesc, BASETYPE, str]")
        // Any iterable of specs is accepted, not just a list.
        .param_type(
            "*.ImageOutput.open",
            "specs",
            "list[ImageSpec]",
            "typing.Iterable[ImageSpec]",
        )
        // Factory functions return None on failure.
        .result_type("*.ImageOutput.create", "object", "ImageOutput | None")
        .result_type("*.ImageOutput.open", "object", "ImageOutput | None")
        .result_type("*.ImageInput.create", "object", "ImageInput | None")
        .result_type("*.ImageInput.open", "object", "ImageInput | None")
        // An uninitialized unique_ptr surfaces as None.
        .result_type("*.ImageInput.read_native_deep_*", "DeepData", "DeepData | None")
        .result_type("*.ImageInput.read_*", "object", "numpy.ndarray | None")
        .result_type("*", "Buffer", "numpy.ndarray")
        .result_type("*.get_pixels", "object", "numpy.ndarray | None")
        // `object` is too restrictive for attribute lookups.
        .result_type("*.getattribute", "object", "typing.Any")
        .result_type("*.ImageSpec.get", "object", "typing.Any")
        .result_type("*.ImageBufAlgo.histogram", "*", "tuple[int, ...]")
        .result_type("*.ImageBufAlgo.isConstantColor", "*", "tuple[float, ...] | None")
        .result_type("*.ImageBufAlgo.color_range_check", "*", "tuple[int, ...] | None")
        .result_type("*.TextureSystem.imagespec", "object", "ImageSpec | None")
        .result_type("*.TextureSystem.texture", "tuple", "tuple[float, ...]")
        .result_type("*.TextureSystem.texture3d", "tuple", "tuple[float, ...]")
        .result_type("*.TextureSystem.environment", "tuple", "tuple[float, ...]")
        .result_type("*.ImageBuf.getpixel", "tuple", "tuple[float, ...]")
        .result_type("*.ImageBuf.interppixel*", "tuple", "tuple[float, ...]")
        .result_type("*.ImageSpec.get_channelformats", "tuple", "tuple[TypeDesc, ...]")
        .property_type("*.ParamValue.value", "object", "typing.Any")
}

fn pyopencolorio_overrides() -> SigOverrides {
    SigOverrides::new()
        .signature("*.__ne__", "(self, other: object) -> bool")
        .signature("*.__eq__", "(self, other: object) -> bool")
}

// ============================================================================
// Tests
// ============================================================================
