use crate::reference::Ref;

/// Bucket counts available to the unique tables.
pub const PRIMES: [usize; 15] = [
    3, 7, 17, 31, 61, 127, 257, 509, 1021, 2053, 4099, 8191, 16381, 32771, 65521,
];

/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for two `u64` values.
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

pub trait MyHash {
    /// Perfect hash function.
    fn hash(&self) -> u64;
}

impl MyHash for (Ref, Ref) {
    fn hash(&self) -> u64 {
        pairing2(self.0.raw() as u64, self.1.raw() as u64)
    }
}

impl MyHash for (u32, u32, u32) {
    fn hash(&self) -> u64 {
        pairing3(self.0 as u64, self.1 as u64, self.2 as u64)
    }
}
