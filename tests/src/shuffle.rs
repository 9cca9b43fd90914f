use {
    anyhow::Result,
    fs_err::{read, write},
    rand::{
        Rng,
        distr::{Alphanumeric, SampleString},
        rng,
    },
    sealstream_sdk::crypto::CHUNK_SIZE,
    std::path::Path,
};

/// Random file content. Lengths around the chunk boundary come up often.
pub fn random_content() -> Vec<u8> {
    let mut rng = rng();
    let len = match rng.random_range(0..6) {
        0 => 0,
        1 => CHUNK_SIZE,
        2 => CHUNK_SIZE - 1,
        3 => CHUNK_SIZE + 1,
        _ => rng.random_range(1..=300_000),
    };
    if rng.random_bool(0.5) {
        Alphanumeric.sample_string(&mut rng, len).into_bytes()
    } else {
        let mut content = vec![0; len];
        rng.fill(&mut content[..]);
        content
    }
}

/// Damages a sealed file in one of the ways an attacker or a bad disk could.
pub fn tamper(path: &Path) -> Result<&'static str> {
    let mut data = read(path)?;
    let mut rng = rng();
    let kind = match rng.random_range(0..4) {
        0 => {
            let index = rng.random_range(0..data.len());
            let bit: u32 = rng.random_range(0..8);
            if let Some(byte) = data.get_mut(index) {
                *byte ^= 1_u8 << bit;
            }
            "flipped bit"
        }
        1 => {
            let len = rng.random_range(0..data.len());
            data.truncate(len);
            "truncated"
        }
        2 => {
            data.push(rng.random());
            "appended byte"
        }
        _ => {
            let index = rng.random_range(0..data.len());
            data.remove(index);
            "removed byte"
        }
    };
    write(path, data)?;
    Ok(kind)
}
