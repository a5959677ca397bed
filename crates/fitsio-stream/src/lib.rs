#![cfg_attr(not(feature = "std"), no_std)]

//! Streaming decoder for FITS files.
//!
//! Input is read once, front to back, in 2880-byte blocks. Each header data
//! unit comes back as a [`Unit`] holding its header, axis extents and either
//! a typed pixel buffer or a table blob with per-column accessors.
//!
//! ```no_run
//! # #[cfg(feature = "std")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = std::fs::File::open("image.fits")?;
//! let units = fitsio_stream::decode(file).into_result()?;
//! for unit in &units {
//!     println!("{} {:?} {:?}", unit.class(), unit.naxis(), unit.stats());
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "std"))]
//! # fn main() {}
//! ```

extern crate alloc;

pub mod bintable;
pub mod block;
pub mod decode;
pub mod endian;
pub mod error;
pub mod field;
pub mod format;
pub mod hdu;
pub mod header;
pub mod image;
pub mod io;
pub mod table;
pub mod value;

pub use block::{BlockReader, BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use decode::{decode, Decoded, Decoder};
pub use error::{Error, ErrorKind, Result};
pub use field::{ColumnRef, FieldAccessor, FieldDescriptor, FieldKind, FieldValue, Scalar, Table};
pub use format::{parse_display, render, DisplayFormat};
pub use hdu::{HduClass, Payload, Unit};
pub use header::{Header, HeaderCard};
pub use image::{Bitpix, BlankPolicy, Image, ImageData, Pixel};
pub use value::HeaderValue;
