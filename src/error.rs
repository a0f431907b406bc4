//! Error types for crystalfx.
//!
//! This module provides error types for asset loading, configuration,
//! GPU initialization, rendering, and debug tunables.

use thiserror::Error;

/// Errors raised while loading assets or building entities from them.
#[derive(Debug, Error)]
pub enum AssetError {
    /// No loaded item is registered under the requested key.
    #[error("No loaded resource named '{0}'")]
    MissingItem(String),
    /// An animated model does not carry enough clips.
    #[error("Animated model has {found} clip(s), at least {required} are required")]
    NotEnoughClips { found: usize, required: usize },
    /// A model has no mesh to take a material from.
    #[error("Model '{0}' contains no mesh")]
    NoMesh(String),
    /// An asset source failed to produce its asset.
    #[error("Failed to load source '{name}': {reason}")]
    Load { name: String, reason: String },
}

/// Errors that can occur while reading or writing a scene configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the file.
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid configuration.
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    /// The configuration parsed but describes an unusable scene.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support.")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}

/// Errors reported by a renderer while presenting a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The GPU ran out of memory; the frame loop should stop.
    #[error("GPU out of memory")]
    OutOfMemory,
    /// A recoverable surface problem; the frame was skipped.
    #[error("Surface error: {0}")]
    Surface(String),
}

impl RenderError {
    /// Whether the frame loop can keep going after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::OutOfMemory)
    }
}

/// Errors from reading or writing debug tunables and commands.
#[derive(Debug, Error, PartialEq)]
pub enum TuneError {
    /// No tunable with this key.
    #[error("Unknown tunable '{0}'")]
    UnknownKey(String),
    /// The value's type does not match the tunable.
    #[error("Tunable '{0}' does not accept this kind of value")]
    TypeMismatch(String),
    /// No command with this name.
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    /// No debug folder with this name.
    #[error("Unknown debug folder '{0}'")]
    UnknownFolder(String),
}

/// Errors that can occur when running an experience.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Failed to create event loop.
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_out_of_memory_is_fatal() {
        assert!(RenderError::OutOfMemory.is_fatal());
        assert!(!RenderError::Surface("timeout".into()).is_fatal());
    }

    #[test]
    fn test_asset_error_message() {
        let err = AssetError::NotEnoughClips {
            found: 2,
            required: 3,
        };
        assert_eq!(
            err.to_string(),
            "Animated model has 2 clip(s), at least 3 are required"
        );
    }
}
