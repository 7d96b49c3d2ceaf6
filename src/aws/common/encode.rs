//! Percent-encoding per the request builder's two variants (`spec.md` §4.1):
//! slash-preserving (the default, used for resource paths so a leading `/`
//! segment is not itself percent-encoded) and strict (used for V4 canonical
//! query strings and the `x-amz-copy-source` subresource segment).

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};

// RFC 3986 unreserved set is alnum + '-' '.' '_' '~'; NON_ALPHANUMERIC encodes
// everything else, so the four unreserved punctuation bytes are carved back out.
const STRICT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const OBJECT_KEY_SET: &AsciiSet = &STRICT_SET.remove(b'/');

/// Percent-encoding according to the S3 specification.
///
/// URI-encodes every byte except the unreserved characters `A-Z a-z 0-9 - . _ ~`.
/// This is the *strict* variant: `/` is encoded too, which is what V4 canonical
/// query strings and the copy-source subresource segment require.
#[inline]
pub fn encode_uri(uri: &str) -> String {
    percent_encode(uri.as_bytes(), STRICT_SET).to_string()
}

/// Percent-encoding for resource paths and object keys.
///
/// Identical to `encode_uri` except `/` is left literal, since some servers
/// reject an encoded slash in the first path segment (`spec.md` §4.1).
#[inline]
pub fn encode_uri_object_key(uri: &str) -> String {
    percent_encode(uri.as_bytes(), OBJECT_KEY_SET).to_string()
}

/// Inverse of both `encode_uri` and `encode_uri_object_key`.
pub fn decode_uri(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uri() {
        assert_eq!("a%20%2Bbb%2Fc", encode_uri("a +bb/c"));
    }

    #[test]
    fn test_encode_uri_object_key() {
        assert_eq!("a%20%2Bbb/c", encode_uri_object_key("a +bb/c"));
    }

    #[test]
    fn decode_is_inverse_of_encode() {
        let samples = ["a +bb/c", "hello world", "/photos/puppy.jpg"];
        for s in &samples {
            assert_eq!(*s, decode_uri(&encode_uri(s)));
            assert_eq!(*s, decode_uri(&encode_uri_object_key(s)));
        }
    }

    #[test]
    fn encode_is_idempotent_on_unreserved_input() {
        let s = "already-Unreserved_123.Value~ok";
        assert_eq!(encode_uri_object_key(s), encode_uri_object_key(&encode_uri_object_key(s)));
    }
}
