use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use pixelate::{
    BlockSize, ComputeKernel, GpuContext, HotKernel, PixelateConfig, PixelateEffect,
    PixelateError, ViewerConfig, headless, reference, run_viewer,
};

#[derive(Parser)]
#[command(name = "pixelate")]
#[command(about = "Screen-space pixelation with a wgpu compute kernel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EffectArgs {
    /// Edge length of a pixel block, clamped to 2..=40
    #[arg(short, long, default_value_t = BlockSize::DEFAULT.get())]
    block_size: u32,

    /// WGSL file to load the compute kernel from instead of the built-in one
    #[arg(short, long)]
    kernel: Option<PathBuf>,

    /// Compute entry point to dispatch
    #[arg(long, default_value = pixelate::DEFAULT_KERNEL_NAME)]
    kernel_name: String,
}

impl EffectArgs {
    fn config(&self) -> PixelateConfig {
        if BlockSize::try_new(self.block_size).is_none() {
            log::warn!(
                "block size {} out of range, clamped to {}",
                self.block_size,
                BlockSize::new(self.block_size)
            );
        }
        PixelateConfig::new()
            .with_block_size(self.block_size)
            .with_kernel_name(self.kernel_name.clone())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open a window showing an animated scene through the effect
    View {
        #[command(flatten)]
        effect: EffectArgs,

        #[arg(long, default_value = "800")]
        width: u32,

        #[arg(long, default_value = "600")]
        height: u32,
    },

    /// Pixelate an image file
    Image {
        input: PathBuf,
        output: PathBuf,

        #[command(flatten)]
        effect: EffectArgs,

        /// Use the CPU reference instead of the GPU
        #[arg(long)]
        reference: bool,
    },
}

fn main() -> Result<(), PixelateError> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::View {
            effect,
            width,
            height,
        } => {
            let config = ViewerConfig::new()
                .size(width, height)
                .effect(effect.config());

            let (kernel, hot) = match &effect.kernel {
                Some(path) => {
                    let hot = HotKernel::new(path)?;
                    (hot.kernel().clone(), Some(hot))
                }
                None => (ComputeKernel::builtin()?, None),
            };
            run_viewer(config, Some(kernel), hot)
        }
        Commands::Image {
            input,
            output,
            effect,
            reference,
        } => process_file(&input, &output, &effect, reference),
    }
}

fn process_file(input: &Path, output: &Path, args: &EffectArgs, use_reference: bool) -> Result<(), PixelateError> {
    let image = image::open(input)?.to_rgba8();
    let config = args.config();
    log::info!(
        "{}: {}x{} at {}",
        input.display(),
        image.width(),
        image.height(),
        config.block_size
    );

    let result = if use_reference {
        reference::pixelate(&image, config.block_size)
    } else {
        let kernel = match &args.kernel {
            Some(path) => ComputeKernel::from_file(path)?,
            None => ComputeKernel::builtin()?,
        };
        let gpu = GpuContext::headless(image.width().max(1), image.height().max(1))?;
        let mut effect = PixelateEffect::new(config, Some(kernel));
        let (result, outcome) = headless::process_image(&gpu, &mut effect, &image)?;
        log::info!("{:?}", outcome);
        result
    };

    result.save(output)?;
    log::info!("wrote {}", output.display());
    Ok(())
}
