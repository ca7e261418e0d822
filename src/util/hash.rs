//! Bob Jenkins' lookup3 `hashlittle`.
//!
//! Property names in RTPC containers and render block tags are hashes of
//! their names with an initial value of zero.

#[inline]
const fn load_le(key: &[u8], start: usize, len: usize) -> u32 {
    let mut value = 0u32;
    let mut i = 0;
    while i < len {
        value |= (key[start + i] as u32) << (8 * i);
        i += 1;
    }
    value
}

#[inline]
const fn mix(mut a: u32, mut b: u32, mut c: u32) -> (u32, u32, u32) {
    a = a.wrapping_sub(c);
    a ^= c.rotate_left(4);
    c = c.wrapping_add(b);
    b = b.wrapping_sub(a);
    b ^= a.rotate_left(6);
    a = a.wrapping_add(c);
    c = c.wrapping_sub(b);
    c ^= b.rotate_left(8);
    b = b.wrapping_add(a);
    a = a.wrapping_sub(c);
    a ^= c.rotate_left(16);
    c = c.wrapping_add(b);
    b = b.wrapping_sub(a);
    b ^= a.rotate_left(19);
    a = a.wrapping_add(c);
    c = c.wrapping_sub(b);
    c ^= b.rotate_left(4);
    b = b.wrapping_add(a);
    (a, b, c)
}

#[inline]
const fn finalize(mut a: u32, mut b: u32, mut c: u32) -> u32 {
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(14));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(11));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(25));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(16));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(4));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(14));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(24));
    c
}

#[inline]
const fn min(a: usize, b: usize) -> usize {
    if a < b {
        a
    } else {
        b
    }
}

pub const fn hash_little(key: &[u8], init: u32) -> u32 {
    let seed = 0xDEADBEEFu32.wrapping_add(key.len() as u32).wrapping_add(init);
    let (mut a, mut b, mut c) = (seed, seed, seed);
    let mut offset = 0;
    let mut len = key.len();
    while len > 12 {
        a = a.wrapping_add(load_le(key, offset, 4));
        b = b.wrapping_add(load_le(key, offset + 4, 4));
        c = c.wrapping_add(load_le(key, offset + 8, 4));
        let mixed = mix(a, b, c);
        a = mixed.0;
        b = mixed.1;
        c = mixed.2;
        offset += 12;
        len -= 12;
    }
    if len == 0 {
        return c;
    }
    a = a.wrapping_add(load_le(key, offset, min(len, 4)));
    if len > 4 {
        b = b.wrapping_add(load_le(key, offset + 4, min(len - 4, 4)));
    }
    if len > 8 {
        c = c.wrapping_add(load_le(key, offset + 8, len - 8));
    }
    finalize(a, b, c)
}

/// Hashes a property or class name.
#[inline]
pub const fn name_hash(name: &str) -> u32 { hash_little(name.as_bytes(), 0) }
