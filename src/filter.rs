//! Spatial convolution and the two-stage high-pass filter chain.
//!
//! Semantics follow OpenCV's `filter2D` with `ddepth = -1`: the kernel is
//! correlated with the image (not flipped), anchored at its centre, borders
//! use `BORDER_REFLECT_101` (`gfedcb|abcdefgh|gfedcba`), every channel is
//! filtered independently and results are rounded half-to-even and saturated
//! to `u8`.

use crate::{error::FilterError, image::Image};

/// Square convolution kernel with an odd side.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    side: usize,
    weights: Vec<f64>,
}

impl Kernel {
    pub fn new(side: usize, weights: Vec<f64>) -> Result<Self, FilterError> {
        if side % 2 == 0 || weights.len() != side * side {
            return Err(FilterError::KernelShape {
                side,
                len: weights.len(),
            });
        }
        Ok(Self { side, weights })
    }

    pub fn from_rows<const N: usize>(rows: [[f64; N]; N]) -> Result<Self, FilterError> {
        Self::new(N, rows.iter().flatten().copied().collect())
    }

    /// 4-neighbour Laplacian, the first stage of the default chain.
    pub fn laplacian4() -> Self {
        Self {
            side: 3,
            weights: vec![0.0, -1.0, 0.0, -1.0, 4.0, -1.0, 0.0, -1.0, 0.0],
        }
    }

    /// 8-neighbour Laplacian, the second stage of the default chain.
    pub fn laplacian8() -> Self {
        Self {
            side: 3,
            weights: vec![-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0],
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn radius(&self) -> usize {
        self.side / 2
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// Convolves `image` with `kernel`, producing a new image of the same geometry.
pub fn convolve(image: &Image, kernel: &Kernel) -> Result<Image, FilterError> {
    image.validate()?;

    let width = image.width() as usize;
    let height = image.height() as usize;
    let channels = image.channels() as usize;
    let side = kernel.side();
    let radius = kernel.radius() as isize;
    let weights = kernel.weights();
    let src = image.as_bytes();

    // x_map[x + k] / y_map[y + k] give the source column / row under kernel tap k
    let x_map: Vec<usize> = (0..width + side - 1)
        .map(|i| reflect_101(i as isize - radius, width))
        .collect();
    let y_map: Vec<usize> = (0..height + side - 1)
        .map(|i| reflect_101(i as isize - radius, height))
        .collect();

    let row_len = width * channels;
    let mut out = vec![0u8; src.len()];
    let mut acc = vec![0f64; channels];

    for y in 0..height {
        for x in 0..width {
            acc.fill(0.0);
            for ky in 0..side {
                let row = y_map[y + ky] * row_len;
                for kx in 0..side {
                    let weight = weights[ky * side + kx];
                    if weight == 0.0 {
                        continue;
                    }
                    let base = row + x_map[x + kx] * channels;
                    for (c, sum) in acc.iter_mut().enumerate() {
                        *sum += weight * src[base + c] as f64;
                    }
                }
            }
            let dst = y * row_len + x * channels;
            for (c, sum) in acc.iter().enumerate() {
                out[dst + c] = saturate_u8(*sum);
            }
        }
    }

    Ok(Image::from_raw(
        image.width(),
        image.height(),
        image.channels(),
        out,
    ))
}

/// Per-frame work a pipeline worker runs: one raw image in, the stage 1 and
/// stage 2 outputs back.
pub trait FrameFilter: Send + Sync + 'static {
    fn apply(&self, image: &Image) -> Result<(Image, Image), FilterError>;
}

/// Two kernels applied in series: stage 2 filters stage 1's output.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    stage1: Kernel,
    stage2: Kernel,
}

impl FilterChain {
    pub fn new(stage1: Kernel, stage2: Kernel) -> Self {
        Self { stage1, stage2 }
    }

    pub fn stage1(&self) -> &Kernel {
        &self.stage1
    }

    pub fn stage2(&self) -> &Kernel {
        &self.stage2
    }

    /// Returns `(stage1, stage2)` as two independent buffers.
    pub fn apply(&self, image: &Image) -> Result<(Image, Image), FilterError> {
        let first = convolve(image, &self.stage1)?;
        let second = convolve(&first, &self.stage2)?;
        Ok((first, second))
    }
}

impl FrameFilter for FilterChain {
    fn apply(&self, image: &Image) -> Result<(Image, Image), FilterError> {
        FilterChain::apply(self, image)
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(Kernel::laplacian4(), Kernel::laplacian8())
    }
}

fn reflect_101(mut i: isize, len: usize) -> usize {
    let n = len as isize;
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

fn saturate_u8(v: f64) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
