#![no_main]
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;
use wscat_codec::{ResponseCodec, ResponseEvent, Result};

fn run(data: &[u8]) -> Result<()> {
    let mut codec = ResponseCodec::new();
    let mut data = BytesMut::from(data);
    while let Some(event) = codec.decode(&mut data)? {
        if event == ResponseEvent::End {
            return Ok(());
        }
    }

    while let Some(event) = codec.decode_eof(&mut data)? {
        if event == ResponseEvent::End {
            break;
        }
    }

    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let _ = run(data);
});
