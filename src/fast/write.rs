//! Writing values straight into pooled buffers.

use bytes::Bytes;
use std::{borrow::Cow, rc::Rc, sync::Arc};

/// Writer for constructing a body in place.
/// Used in [body_with](crate::Response::body_with) and
/// [body_writer](crate::Request::body_writer).
///
/// # Examples
///
/// With [WriteBuffer]:
/// ```
/// # maker_adaptor::run_test(|_, resp| {
/// use maker_adaptor::StatusCode;
///
/// resp.status(StatusCode::Ok)
///     .body_with(|w| {
///         w.write("This goes in the response body");
///         w.write(128);
///         w.write(true);
///     })
/// # });
/// ```
/// With [std::io::Write]:
/// ```
/// # maker_adaptor::run_test(|_, resp| {
/// use maker_adaptor::StatusCode;
/// use std::io::Write;
///
/// resp.status(StatusCode::Ok)
///     .body_with(|w| {
///         let _ = write!(w, "{} - {} = {}", 6, 2, 4);
///     })
/// # });
/// ```
#[derive(Debug)]
pub struct BodyWriter<'a>(pub(crate) &'a mut Vec<u8>);

impl BodyWriter<'_> {
    /// Appends content to the body.
    #[inline]
    pub fn write<T: WriteBuffer>(&mut self, value: T) {
        value.write_to(self.0);
    }

    /// Number of body bytes written so far, including earlier content.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::io::Write for BodyWriter<'_> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Trait for writing data into pooled buffers (headers and bodies).
///
/// Implemented for strings, bytes, `http` header types, booleans and
/// integers. Floating-point numbers are left out on purpose: their textual
/// form depends on precision choices the caller should make explicitly.
///
/// # Example
/// ```
/// use maker_adaptor::WriteBuffer;
///
/// struct MyString(String);
///
/// impl WriteBuffer for MyString {
///     fn write_to(&self, buffer: &mut Vec<u8>) {
///         buffer.extend_from_slice(self.0.as_bytes())
///     }
/// }
/// ```
pub trait WriteBuffer {
    /// Writes the value's representation directly to the buffer.
    fn write_to(&self, buffer: &mut Vec<u8>);
}

macro_rules! impl_write_buffer {
    (bytes, $conv:expr => $($t:ty),*) => {
        $(impl WriteBuffer for $t {
            #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                let closure = $conv;
                closure(self, buffer);
            }
        })*
    };
    (number($type:ty), $conv:expr => $($t:ty),*) => {
        $(impl WriteBuffer for $t {
            #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                $conv(*self as $type, buffer);
            }
        })*
    };
}

impl<T: WriteBuffer + ?Sized> WriteBuffer for &T {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        T::write_to(*self, buffer);
    }
}
impl<T: WriteBuffer + ?Sized> WriteBuffer for &mut T {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        T::write_to(*self, buffer);
    }
}
impl_write_buffer! {
    bytes, |value: &str, buffer: &mut Vec<u8>| {
        buffer.extend_from_slice(value.as_bytes());
    } => str, String, Box<str>, Cow<'_, str>, Arc<str>, Rc<str>
}
impl_write_buffer! {
    bytes, |value: &[u8], buffer: &mut Vec<u8>| {
        buffer.extend_from_slice(value);
    } => [u8], Vec<u8>, Box<[u8]>, Cow<'_, [u8]>, Arc<[u8]>, Rc<[u8]>, Bytes
}
impl<const N: usize> WriteBuffer for [u8; N] {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self);
    }
}
impl WriteBuffer for http::HeaderName {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self.as_str().as_bytes());
    }
}
impl WriteBuffer for http::HeaderValue {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self.as_bytes());
    }
}
impl_write_buffer! {
    number(u128), write_u128 => u8, u16, u32, u64, u128, usize
}
impl_write_buffer! {
    number(i128), write_i128 => i8, i16, i32, i64, i128, isize
}
impl WriteBuffer for bool {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(match self {
            true => b"true",
            false => b"false",
        });
    }
}
impl WriteBuffer for char {
    #[inline]
    fn write_to(&self, buffer: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        buffer.extend_from_slice(self.encode_utf8(&mut buf).as_bytes());
    }
}

#[inline]
const fn number_to_bytes(mut n: u128) -> ([u8; 39], usize) {
    let mut buffer = [b'0'; 39];
    let mut i = 39;

    if n == 0 {
        return (buffer, 38);
    }

    while n > 0 {
        i -= 1;
        buffer[i] = b'0' + (n % 10) as u8;
        n /= 10;
    }

    (buffer, i)
}

#[inline(always)]
fn write_u128(value: u128, buffer: &mut Vec<u8>) {
    let (arr, start) = number_to_bytes(value);
    buffer.extend_from_slice(&arr[start..]);
}

#[inline(always)]
fn write_i128(value: i128, buffer: &mut Vec<u8>) {
    if value < 0 {
        buffer.push(b'-');
    }

    let (arr, start) = number_to_bytes(value.unsigned_abs());
    buffer.extend_from_slice(&arr[start..]);
}
