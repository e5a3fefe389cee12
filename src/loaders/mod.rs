pub mod gltf;

use std::path::Path;

use anyhow::{bail, Result};

pub use self::gltf::{load_gltf, load_gltf_slice};

use crate::placement::SourceFormat;
use crate::scene::SceneObject;

/// Load a model file, picking the importer from its extension
pub fn load_model(path: impl AsRef<Path>) -> Result<(SceneObject, SourceFormat)> {
    let path = path.as_ref();
    let Some(format) = SourceFormat::from_path(path) else {
        bail!("Unsupported model file: {:?}", path);
    };

    match format {
        SourceFormat::Glb | SourceFormat::Gltf => Ok((load_gltf(path)?, format)),
        other => bail!("No importer available for .{} files", other.extension()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_extension_rejected() {
        let err = load_model("model.txt").unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[test]
    fn test_format_without_importer_rejected() {
        let err = load_model("model.fbx").unwrap_err();
        assert!(err.to_string().contains(".fbx"));
    }

    #[test]
    fn test_missing_gltf_file_fails() {
        assert!(load_model("does/not/exist.glb").is_err());
    }
}
