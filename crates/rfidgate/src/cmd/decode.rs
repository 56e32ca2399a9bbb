use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};

use rfidgate_frame::FrameReader;

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    if !(rfidgate_frame::MIN_FRAME_SIZE..=rfidgate_frame::MAX_WIRE_FRAME_SIZE)
        .contains(&args.max_frame_size)
    {
        return Err(CliError::new(
            USAGE,
            format!("--max-frame-size {} is out of range", args.max_frame_size),
        ));
    }

    let frames = if let Some(hex) = &args.hex {
        let bytes = parse_hex("--hex", hex)?;
        decode_stream(Cursor::new(bytes), args.max_frame_size, format)?
    } else if let Some(path) = &args.file {
        let file = File::open(path)
            .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
        decode_stream(BufReader::new(file), args.max_frame_size, format)?
    } else {
        decode_stream(io::stdin().lock(), args.max_frame_size, format)?
    };

    if frames == 0 {
        return Err(CliError::new(DATA_INVALID, "no valid frames in input"));
    }
    Ok(SUCCESS)
}

/// Print every frame in `input`; returns how many decoded.
fn decode_stream<R: Read>(input: R, max_frame_size: usize, format: OutputFormat) -> CliResult<u64> {
    let mut reader = FrameReader::with_max_frame_size(input, max_frame_size);
    for frame in reader.by_ref() {
        let frame = frame.map_err(|err| frame_error("read failed", err))?;
        print_frame(&frame, format);
    }

    let stats = reader.stats();
    tracing::debug!(
        frames = stats.frames,
        checksum_failures = stats.checksum_failures,
        decode_failures = stats.decode_failures,
        oversize_skips = stats.oversize_skips,
        discarded_bytes = stats.discarded_bytes,
        "input decoded"
    );
    if stats.checksum_failures + stats.decode_failures > 0 {
        tracing::warn!(
            checksum_failures = stats.checksum_failures,
            decode_failures = stats.decode_failures,
            "skipped malformed frames"
        );
    }
    Ok(stats.frames)
}
