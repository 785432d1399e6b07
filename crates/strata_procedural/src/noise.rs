//! # Noise Sources
//!
//! Deterministic 2D noise used by the bundled terrain sampler.
//!
//! ## Determinism Guarantee
//!
//! Every function here is a pure function of `(seed, x, z)`. No state is
//! mutated after construction, so a noise source can be shared between
//! threads and will produce the same value for the same input on any
//! platform, in any run.

use serde::{Deserialize, Serialize};

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives an independent sub-seed for one noise channel.
    #[inline]
    #[must_use]
    pub const fn derive(self, channel: u64) -> Self {
        Self(mix64(self.0 ^ channel.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
    }
}

/// SplitMix64 finalizer.
#[inline]
#[must_use]
pub const fn mix64(mut value: u64) -> u64 {
    value = (value ^ (value >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    value = (value ^ (value >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    value ^ (value >> 31)
}

/// Hashes an integer lattice point under a seed.
#[inline]
#[must_use]
pub const fn hash2(seed: WorldSeed, x: i32, z: i32) -> u64 {
    let packed = ((x as u32 as u64) << 32) | (z as u32 as u64);
    mix64(seed.0 ^ mix64(packed))
}

/// Maps a hash to a float in `[0, 1)` using its top 24 bits.
#[inline]
#[must_use]
pub fn unit_f32(hash: u64) -> f32 {
    (hash >> 40) as f32 / (1u64 << 24) as f32
}

/// Seeded permutation of `0..256`, doubled to skip index wrapping.
struct Permutation {
    table: [u8; 512],
}

impl Permutation {
    fn new(seed: WorldSeed) -> Self {
        let mut table = [0u8; 512];
        for (i, slot) in table.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates driven by SplitMix64.
        let mut state = seed.value();
        for i in (1..256usize).rev() {
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let j = (mix64(state) % (i as u64 + 1)) as usize;
            table.swap(i, j);
        }

        let (low, high) = table.split_at_mut(256);
        high.copy_from_slice(low);

        Self { table }
    }

    #[inline]
    fn at(&self, index: usize) -> usize {
        usize::from(self.table[index & 511])
    }
}

/// 2D simplex noise producing values in `[-1, 1]`.
pub struct SimplexNoise {
    perm: Permutation,
}

impl SimplexNoise {
    /// Skew factor, (sqrt(3) - 1) / 2.
    const F2: f64 = 0.366_025_403_784_438_6;
    /// Unskew factor, (3 - sqrt(3)) / 6.
    const G2: f64 = 0.211_324_865_405_187_1;

    /// Gradient directions for 2D simplex.
    const GRADIENTS: [(f64, f64); 8] = [
        (1.0, 0.0),
        (-1.0, 0.0),
        (0.0, 1.0),
        (0.0, -1.0),
        (0.707_106_781, 0.707_106_781),
        (-0.707_106_781, 0.707_106_781),
        (0.707_106_781, -0.707_106_781),
        (-0.707_106_781, -0.707_106_781),
    ];

    /// Creates a noise source from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm: Permutation::new(seed),
        }
    }

    /// Samples noise at `(x, z)`.
    #[must_use]
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let skew = (x + z) * Self::F2;
        let i = (x + skew).floor();
        let j = (z + skew).floor();

        let unskew = (i + j) * Self::G2;
        let x0 = x - (i - unskew);
        let z0 = z - (j - unskew);

        let (i1, j1) = if x0 > z0 { (1usize, 0usize) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let z1 = z0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let z2 = z0 - 1.0 + 2.0 * Self::G2;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;

        let g0 = self.perm.at(ii + self.perm.at(jj));
        let g1 = self.perm.at(ii + i1 + self.perm.at(jj + j1));
        let g2 = self.perm.at(ii + 1 + self.perm.at(jj + 1));

        let total = Self::corner(x0, z0, g0) + Self::corner(x1, z1, g1) + Self::corner(x2, z2, g2);

        (total * 99.2).clamp(-1.0, 1.0)
    }

    #[inline]
    fn corner(x: f64, z: f64, hash: usize) -> f64 {
        let falloff = 0.5 - x * x - z * z;
        if falloff <= 0.0 {
            return 0.0;
        }
        let (gx, gz) = Self::GRADIENTS[hash & 7];
        let f2 = falloff * falloff;
        f2 * f2 * (gx * x + gz * z)
    }

    /// Fractal sum of `octaves` layers, normalized to `[-1, 1]`.
    #[must_use]
    pub fn fbm(&self, x: f64, z: f64, octaves: u32, gain: f64, lacunarity: f64) -> f64 {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut norm = 0.0;

        for _ in 0..octaves {
            sum += self.sample(x * frequency, z * frequency) * amplitude;
            norm += amplitude;
            amplitude *= gain;
            frequency *= lacunarity;
        }

        if norm > 0.0 {
            sum / norm
        } else {
            0.0
        }
    }

    /// Ridged fractal noise in `[0, 1]`, sharp crests for mountain ranges.
    #[must_use]
    pub fn ridged(&self, x: f64, z: f64, octaves: u32, gain: f64, lacunarity: f64) -> f64 {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut norm = 0.0;

        for _ in 0..octaves {
            let ridge = 1.0 - self.sample(x * frequency, z * frequency).abs();
            sum += ridge * ridge * amplitude;
            norm += amplitude;
            amplitude *= gain;
            frequency *= lacunarity;
        }

        if norm > 0.0 {
            sum / norm
        } else {
            0.0
        }
    }
}

/// Cellular (Worley) noise returning a per-cell value.
///
/// The plane is split into jittered cells of `cell_size` blocks. Every
/// point inside a cell gets the same value in `[0, 1)`, derived from the
/// hash of its nearest feature point. This is what gives neighbouring
/// columns a shared biome identity.
pub struct CellularNoise {
    seed: WorldSeed,
    cell_size: f64,
    jitter: f64,
}

impl CellularNoise {
    /// Creates a cellular noise source.
    ///
    /// # Arguments
    ///
    /// * `seed` - Channel seed
    /// * `cell_size` - Average cell width in blocks
    /// * `jitter` - Feature point displacement, 0 (grid) to 1 (fully random)
    #[must_use]
    pub fn new(seed: WorldSeed, cell_size: f64, jitter: f64) -> Self {
        Self {
            seed,
            cell_size: cell_size.max(1.0),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Returns the value of the cell containing `(x, z)`.
    #[must_use]
    pub fn value(&self, x: f64, z: f64) -> f32 {
        let fx = x / self.cell_size;
        let fz = z / self.cell_size;
        let cx = fx.floor() as i32;
        let cz = fz.floor() as i32;

        let mut nearest = f64::MAX;
        let mut winner = 0u64;

        for dz in -1..=1 {
            for dx in -1..=1 {
                let gx = cx.wrapping_add(dx);
                let gz = cz.wrapping_add(dz);
                let hash = hash2(self.seed, gx, gz);

                let px = f64::from(gx) + 0.5 + (f64::from(unit_f32(hash)) - 0.5) * self.jitter;
                let pz = f64::from(gz)
                    + 0.5
                    + (f64::from(unit_f32(mix64(hash))) - 0.5) * self.jitter;

                let distance = (px - fx) * (px - fx) + (pz - fz) * (pz - fz);
                if distance < nearest {
                    nearest = distance;
                    winner = hash;
                }
            }
        }

        unit_f32(mix64(winner ^ 0xA5A5_A5A5_A5A5_A5A5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let seed = WorldSeed::new(12345);
        let noise1 = SimplexNoise::new(seed);
        let noise2 = SimplexNoise::new(seed);

        for i in 0..100 {
            let x = f64::from(i) * 0.1;
            let z = f64::from(i) * 0.17;
            assert_eq!(noise1.sample(x, z), noise2.sample(x, z), "Noise should be deterministic");
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let noise1 = SimplexNoise::new(WorldSeed::new(1));
        let noise2 = SimplexNoise::new(WorldSeed::new(2));

        let differing = (0..50)
            .filter(|i| {
                let x = f64::from(*i) * 3.3 + 0.25;
                noise1.sample(x, x * 0.5) != noise2.sample(x, x * 0.5)
            })
            .count();

        assert!(differing > 40, "Different seeds should produce different noise");
    }

    #[test]
    fn test_range() {
        let noise = SimplexNoise::new(WorldSeed::new(42));

        for i in 0..10_000 {
            let x = f64::from(i) * 0.1 - 500.0;
            let z = f64::from(i) * 0.13 - 650.0;
            let value = noise.sample(x, z);
            assert!((-1.0..=1.0).contains(&value), "Value {value} out of range at ({x}, {z})");

            let ridged = noise.ridged(x, z, 3, 0.5, 2.0);
            assert!((0.0..=1.0).contains(&ridged), "Ridged {ridged} out of range");
        }
    }

    #[test]
    fn test_continuity() {
        let noise = SimplexNoise::new(WorldSeed::new(42));

        let v1 = noise.sample(100.0, 100.0);
        let v2 = noise.sample(100.001, 100.0);
        let v3 = noise.sample(100.0, 100.001);

        assert!((v1 - v2).abs() < 0.01, "Noise should be continuous");
        assert!((v1 - v3).abs() < 0.01, "Noise should be continuous");
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);

        assert_ne!(base.derive(1), base.derive(2));
        assert_eq!(base.derive(1), base.derive(1));
        assert_ne!(base.derive(1), base);
    }

    #[test]
    fn test_cellular_value_range_and_sharing() {
        let cells = CellularNoise::new(WorldSeed::new(7), 64.0, 0.0);

        // With zero jitter cells are an exact grid, so a cell's interior
        // shares one value.
        let a = cells.value(10.0, 10.0);
        let b = cells.value(50.0, 20.0);
        assert_eq!(a, b, "Points in one cell share a value");

        for i in -200..200 {
            let value = cells.value(f64::from(i) * 7.5, f64::from(i) * -3.25);
            assert!((0.0..1.0).contains(&value), "Cell value {value} out of range");
        }
    }

    #[test]
    fn test_unit_f32_bounds() {
        assert_eq!(unit_f32(0), 0.0);
        assert!(unit_f32(u64::MAX) < 1.0);
    }
}
