/*++

Licensed under the Apache-2.0 license.

File Name:

    array.rs

Abstract:

    File contains word array definitions used for digests and fused hashes.

--*/

macro_rules! array4 {
    ($dim: literal) => {
        paste::paste! {
             pub const [<ARRAY_4X $dim _BYTE_SIZE>]: usize = $dim * core::mem::size_of::<u32>();
             pub const [<ARRAY_4X $dim _WORD_SIZE>]: usize = $dim ;

             #[derive(Debug, Default, Copy, Clone, Eq, PartialEq, zeroize::Zeroize)]
             pub struct [<Array4x $dim>](pub [u32; [<ARRAY_4X $dim _WORD_SIZE>]]);

             impl [<Array4x $dim>] {
                 /// True if every word is zero
                 pub fn is_zero(&self) -> bool {
                     self.0.iter().fold(0u32, |acc, w| acc | *w) == 0
                 }
             }

             impl From<[u8; [<ARRAY_4X $dim _BYTE_SIZE>]]> for [<Array4x $dim>] {
                 #[inline(never)]
                 fn from(value: [u8; [<ARRAY_4X $dim _BYTE_SIZE>]]) -> Self {
                     Self::from(&value)
                 }
             }

             impl<'a> From<&'a [u8; [<ARRAY_4X $dim _BYTE_SIZE>]]> for [<Array4x $dim>] {
                 #[inline(never)]
                 fn from(value: &'a [u8; [<ARRAY_4X $dim _BYTE_SIZE>]]) -> Self {
                     let mut result = [<Array4x $dim>]([0u32; [<ARRAY_4X $dim _WORD_SIZE>]]);

                     for (word, bytes) in result.0.iter_mut().zip(value.chunks_exact(4)) {
                         *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                     }

                     result
                 }
             }

             impl From<[<Array4x $dim>]> for [u8; [<ARRAY_4X $dim _BYTE_SIZE>]] {
                 #[inline(never)]
                 fn from(value: [<Array4x $dim>]) -> Self {
                     let mut result = [0u8; [<ARRAY_4X $dim _BYTE_SIZE>]];

                     for (bytes, word) in result.chunks_exact_mut(4).zip(value.0.iter()) {
                         bytes.copy_from_slice(&word.to_be_bytes());
                     }

                     result
                 }
             }

             impl From<[u32; [<ARRAY_4X $dim _WORD_SIZE>]]> for [<Array4x $dim>] {
                 #[inline(never)]
                 fn from(value: [u32; [<ARRAY_4X $dim _WORD_SIZE>]]) -> Self {
                     [<Array4x $dim>](value)
                 }
             }

             impl From<[<Array4x $dim>]> for [u32; [<ARRAY_4X $dim _WORD_SIZE>]] {
                 #[inline(never)]
                 fn from(value: [<Array4x $dim>]) -> Self {
                     value.0
                 }
             }
        }
    };
}

array4!(8);
array4!(12);

impl Array4x12 {
    /// Upper 256 bits of a 384-bit digest, the part kept in eFuse
    pub fn upper_256(&self) -> Array4x8 {
        let mut result = Array4x8::default();
        result.0.copy_from_slice(&self.0[..ARRAY_4X8_WORD_SIZE]);
        result
    }
}
