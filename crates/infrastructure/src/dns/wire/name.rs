use super::{WireError, DNS_COMPRESSION_BITS, MAX_LABEL_LEN, MAX_NAME_LEN};

/// Strips a single trailing dot and lowercases, giving the form used for
/// comparisons and registry keys.
pub fn normalize_name(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

/// Encodes `name` as length-prefixed labels ending in the root label.
/// Nothing is written to `out` unless the whole name is valid.
pub fn encode_name(name: &str, out: &mut Vec<u8>) -> Result<(), WireError> {
    let encoded = wire_name(name)?;
    out.extend_from_slice(&encoded);
    Ok(())
}

pub fn wire_name(name: &str) -> Result<Vec<u8>, WireError> {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() {
        return Ok(vec![0]);
    }

    let mut buf = Vec::with_capacity(name.len() + 2);
    for label in name.split('.') {
        if label.is_empty() {
            return Err(WireError::EmptyLabel);
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(WireError::LabelTooLong(label.len()));
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(WireError::NameTooLong(name.len()));
    }
    buf.push(0);
    Ok(buf)
}

/// Decodes the name at `offset`, following compression pointers.
///
/// Returns the dotted name (without trailing dot, empty for the root) and
/// the offset just past the name's encoding at its original location.
/// Every pointer must target a position strictly before the start of the
/// label run it was found in, so decoding always terminates.
pub fn decode_name(msg: &[u8], offset: usize) -> Result<(String, usize), WireError> {
    let mut name = String::new();
    let mut pos = offset;
    let mut segment_start = offset;
    let mut resume_at = None;

    loop {
        let len = *msg.get(pos).ok_or(WireError::Truncated { offset: pos })?;

        match len & DNS_COMPRESSION_BITS {
            0x00 => {
                pos += 1;
                if len == 0 {
                    break;
                }
                let end = pos + len as usize;
                let label = msg
                    .get(pos..end)
                    .ok_or(WireError::Truncated { offset: pos })?;
                if !name.is_empty() {
                    name.push('.');
                }
                name.push_str(&String::from_utf8_lossy(label));
                if name.len() > MAX_NAME_LEN {
                    return Err(WireError::NameTooLong(name.len()));
                }
                pos = end;
            }
            DNS_COMPRESSION_BITS => {
                let low = *msg
                    .get(pos + 1)
                    .ok_or(WireError::Truncated { offset: pos + 1 })?;
                let target = (((len & !DNS_COMPRESSION_BITS) as usize) << 8) | low as usize;
                if target >= segment_start {
                    return Err(WireError::BadPointer {
                        offset: pos,
                        target,
                    });
                }
                resume_at.get_or_insert(pos + 2);
                segment_start = target;
                pos = target;
            }
            _ => return Err(WireError::BadLabelType(len)),
        }
    }

    Ok((name, resume_at.unwrap_or(pos)))
}
