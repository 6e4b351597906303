//! exec-demux binary entry point.
//!
//! Decodes a captured exec/attach output stream from a file or stdin.

use std::process::ExitCode;

use container_exec::cli::{self, Args};
use container_exec::config::Config;
use container_exec::logging;
use container_exec::stream::{
    collect_all, collect_demuxed, DemuxedStream, FrameDemultiplexer, OutputStream,
};
use container_exec::{ExecError, OutputMode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'exec-demux --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Another subscriber may already be installed when embedded
    let _ = logging::init_with_filter(config.log_filter());

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("exec-demux failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &Config) -> Result<(), BoxError> {
    let options = args.start_options()?;
    let stream_config = config.stream_config()?;

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Some(path) if !args.reads_stdin() => {
            debug!("reading {}", path.display());
            Box::new(tokio::fs::File::open(path).await?)
        }
        _ => {
            debug!("reading stdin");
            Box::new(tokio::io::stdin())
        }
    };

    let demux = FrameDemultiplexer::new(reader, options.tty(), stream_config.buffer_size);
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    match options.mode() {
        OutputMode::Stream => {
            let mut chunks = OutputStream::spawn(demux, stream_config.channel_capacity);
            while let Some(chunk) = chunks.next_chunk().await {
                write_flush(&mut stdout, &chunk).await?;
            }
        }
        OutputMode::StreamDemuxed => {
            let mut chunks = DemuxedStream::spawn(demux, stream_config.channel_capacity);
            while let Some(chunk) = chunks.next_chunk().await {
                if !chunk.stdout.is_empty() {
                    write_flush(&mut stdout, &chunk.stdout).await?;
                }
                if !chunk.stderr.is_empty() {
                    write_flush(&mut stderr, &chunk.stderr).await?;
                }
            }
        }
        OutputMode::Complete => {
            let text = collect_all(demux).await;
            write_flush(&mut stdout, &text).await?;
        }
        OutputMode::CompleteDemuxed => {
            let output = collect_demuxed(demux).await;
            write_flush(&mut stdout, &output.stdout).await?;
            write_flush(&mut stderr, &output.stderr).await?;
        }
        mode @ (OutputMode::Detached | OutputMode::Socket) => {
            return Err(ExecError::InvalidOptions(format!(
                "{:?} output has nothing to decode",
                mode
            ))
            .into());
        }
    }

    Ok(())
}

async fn write_flush<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}
