//! Baked lookup tables.
//!
//! Both table types sample the unit domain `[0, 1]`; input outside it is
//! clamped. Tables carry a name that identifies their content in processor
//! fingerprints, so two tables with the same name must hold the same data.

use grade_core::{EngineError, EngineResult, Interpolation, TextureChannels};

/// A 1D lookup table.
///
/// One channel applies the same curve to R, G and B; three channels hold an
/// interleaved curve per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1d {
    name: String,
    channels: TextureChannels,
    size: usize,
    values: Vec<f32>,
}

impl Lut1d {
    /// Create from interleaved values.
    pub fn new(name: impl Into<String>, channels: TextureChannels, values: Vec<f32>) -> EngineResult<Self> {
        let n = channels.count();
        if values.len() < 2 * n || values.len() % n != 0 {
            return Err(EngineError::InvalidLut {
                reason: format!("1D LUT needs at least 2 entries of {} floats, got {} floats", n, values.len()),
            });
        }
        Ok(Self { name: name.into(), channels, size: values.len() / n, values })
    }

    /// Bake a single-channel curve by sampling `f` over `[0, 1]`.
    ///
    /// `size` is raised to 2 if smaller.
    pub fn from_fn(name: impl Into<String>, size: usize, f: impl Fn(f32) -> f32) -> Self {
        let size = size.max(2);
        let step = 1.0 / (size - 1) as f32;
        let values = (0..size).map(|i| f(i as f32 * step)).collect();
        Self { name: name.into(), channels: TextureChannels::Red, size, values }
    }

    /// Bake a three-channel curve by sampling `f` over `[0, 1]`.
    ///
    /// `size` is raised to 2 if smaller.
    pub fn from_fn_rgb(name: impl Into<String>, size: usize, f: impl Fn(f32) -> [f32; 3]) -> Self {
        let size = size.max(2);
        let step = 1.0 / (size - 1) as f32;
        let values = (0..size).flat_map(|i| f(i as f32 * step)).collect();
        Self { name: name.into(), channels: TextureChannels::Rgb, size, values }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel layout.
    pub fn channels(&self) -> TextureChannels {
        self.channels
    }

    /// Entries per channel.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Interleaved values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    fn entry(&self, i: usize, channel: usize) -> f32 {
        match self.channels {
            TextureChannels::Red => self.values[i],
            TextureChannels::Rgb => self.values[i * 3 + channel],
        }
    }

    /// Sample one channel with linear interpolation.
    #[inline]
    pub fn sample(&self, x: f32, channel: usize) -> f32 {
        let n = (self.size - 1) as f32;
        let pos = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) * n };
        let i = (pos.floor() as usize).min(self.size - 2);
        let t = pos - i as f32;
        let a = self.entry(i, channel);
        let b = self.entry(i + 1, channel);
        a + (b - a) * t
    }

    /// Apply to an RGB triple.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        [self.sample(rgb[0], 0), self.sample(rgb[1], 1), self.sample(rgb[2], 2)]
    }

    /// Pack into rows of at most `max_width` texels.
    ///
    /// Rows overlap by one entry (the last texel of a row repeats as the first
    /// of the next) so linear filtering inside a row reproduces the 1D curve.
    /// Returns `(width, height, texels)`; the last row is padded with the final
    /// entry.
    pub fn packed(&self, max_width: usize) -> (usize, usize, Vec<f32>) {
        let max_width = max_width.max(2);
        if self.size <= max_width {
            return (self.size, 1, self.values.clone());
        }
        let n = self.channels.count();
        let stride = max_width - 1;
        let height = (self.size - 1).div_ceil(stride);
        let mut texels = Vec::with_capacity(max_width * height * n);
        for row in 0..height {
            for col in 0..max_width {
                let i = (row * stride + col).min(self.size - 1);
                texels.extend_from_slice(&self.values[i * n..i * n + n]);
            }
        }
        (max_width, height, texels)
    }
}

/// A 3D lookup table with red varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3d {
    name: String,
    size: usize,
    interpolation: Interpolation,
    data: Vec<[f32; 3]>,
}

impl Lut3d {
    /// Create from grid data, `size^3` entries.
    pub fn new(name: impl Into<String>, size: usize, data: Vec<[f32; 3]>) -> EngineResult<Self> {
        if size < 2 || data.len() != size * size * size {
            return Err(EngineError::InvalidLut {
                reason: format!("3D LUT of edge {} needs {} entries, got {}", size, size * size * size, data.len()),
            });
        }
        Ok(Self { name: name.into(), size, interpolation: Interpolation::Linear, data })
    }

    /// Bake by sampling `f` on a `size^3` grid over the unit cube.
    ///
    /// `size` is raised to 2 if smaller.
    pub fn from_fn(name: impl Into<String>, size: usize, f: impl Fn([f32; 3]) -> [f32; 3]) -> Self {
        let size = size.max(2);
        let step = 1.0 / (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push(f([r as f32 * step, g as f32 * step, b as f32 * step]));
                }
            }
        }
        Self { name: name.into(), size, interpolation: Interpolation::Linear, data }
    }

    /// Sets the interpolation mode.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Samples per axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Interpolation mode.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Flattened RGB values.
    pub fn flat_values(&self) -> Vec<f32> {
        self.data.iter().flat_map(|c| c.iter().copied()).collect()
    }

    #[inline]
    fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[b * self.size * self.size + g * self.size + r]
    }

    /// Apply to an RGB triple.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let n = (self.size - 1) as f32;
        let unit = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) * n };
        let (r, g, b) = (unit(rgb[0]), unit(rgb[1]), unit(rgb[2]));

        if self.interpolation == Interpolation::Nearest {
            return self.get(r.round() as usize, g.round() as usize, b.round() as usize);
        }

        let ri = (r.floor() as usize).min(self.size - 2);
        let gi = (g.floor() as usize).min(self.size - 2);
        let bi = (b.floor() as usize).min(self.size - 2);
        let (rf, gf, bf) = (r - ri as f32, g - gi as f32, b - bi as f32);

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let c00 = c000[c] + (c100[c] - c000[c]) * rf;
            let c10 = c010[c] + (c110[c] - c010[c]) * rf;
            let c01 = c001[c] + (c101[c] - c001[c]) * rf;
            let c11 = c011[c] + (c111[c] - c011[c]) * rf;
            let c0 = c00 + (c10 - c00) * gf;
            let c1 = c01 + (c11 - c01) * gf;
            out[c] = c0 + (c1 - c0) * bf;
        }
        out
    }
}
