use thiserror::Error;

/// Invalid enhancement parameters. Always fatal to the call that sees it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("scale factor must be a positive finite number, got {0}")]
    InvalidScale(f32),

    #[error("{name} kernel must be at least 1x1, got {width}x{height}")]
    EmptyKernel {
        name: &'static str,
        width: u32,
        height: u32,
    },

    #[error("{name} kernel must be at most {max}x{max}, got {width}x{height}")]
    KernelTooLarge {
        name: &'static str,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("contrast tile grid must be at least 1x1, got {0}x{1}")]
    EmptyTileGrid(u32, u32),

    #[error("contrast clip limit must be a non-negative finite number, got {0}")]
    InvalidClipLimit(f32),

    #[error("sharpen amount must be a non-negative finite number, got {0}")]
    InvalidSharpenAmount(f32),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
