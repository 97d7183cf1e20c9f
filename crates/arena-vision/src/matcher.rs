use crate::templates::Template;
use arena_state::Point;
use image::GrayImage;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Best alignment of a template within a search image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub top_left: Point,
    /// Zero-mean normalized cross-correlation in [-1.0, 1.0]
    pub score: f64,
}

impl MatchScore {
    /// Template center in search-image coordinates
    pub fn center(&self, template: &Template) -> Point {
        Point::new(
            self.top_left.x + template.width() / 2,
            self.top_left.y + template.height() / 2,
        )
    }
}

/// Find `template` in `search` and return its center if the best
/// correlation reaches `threshold`.
///
/// A template larger than the search image in either dimension is a normal
/// "not found". Flat windows and flat templates score 0.
pub fn find(search: &GrayImage, template: &Template, threshold: f64) -> Option<Point> {
    SearchImage::new(search).find(template, threshold)
}

/// Score every alignment of `template` inside `search` and keep the highest.
pub fn best_match(search: &GrayImage, template: &Template) -> Option<MatchScore> {
    SearchImage::new(search).best_match(template)
}

/// A search image prepared for matching many templates.
///
/// Window sums come from integral images. The cross term of every alignment
/// comes from one FFT correlation per template; the image spectrum is
/// computed on first use and shared by later templates.
pub struct SearchImage<'a> {
    image: &'a GrayImage,
    integral: IntegralImage,
    spectrum: OnceLock<Spectrum>,
}

impl<'a> SearchImage<'a> {
    pub fn new(image: &'a GrayImage) -> Self {
        Self {
            image,
            integral: IntegralImage::new(image),
            spectrum: OnceLock::new(),
        }
    }

    pub fn image(&self) -> &GrayImage {
        self.image
    }

    pub fn find(&self, template: &Template, threshold: f64) -> Option<Point> {
        let best = self.best_match(template)?;
        if best.score >= threshold {
            Some(best.center(template))
        } else {
            None
        }
    }

    /// Alignments are scanned row by row, left to right; the first maximum
    /// wins. Callers should not rely on which of several equal peaks is
    /// reported.
    pub fn best_match(&self, template: &Template) -> Option<MatchScore> {
        let (sw, sh) = self.image.dimensions();
        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > sw || th > sh {
            return None;
        }

        let n = (tw as u64 * th as u64) as i128;
        let t_sum = template.sum() as i128;
        // n * sum((T - mean)^2)
        let t_var = n * template.sum_sq() as i128 - t_sum * t_sum;
        if t_var <= 0 {
            return Some(MatchScore {
                top_left: Point::new(0, 0),
                score: 0.0,
            });
        }

        let cross = self.spectrum().correlate(template);
        let stride = sw as usize;

        let mut best = MatchScore {
            top_left: Point::new(0, 0),
            score: f64::NEG_INFINITY,
        };

        for y in 0..=(sh - th) {
            for x in 0..=(sw - tw) {
                let (w_sum, w_sum_sq) = self.integral.window(x, y, tw, th);
                let w_sum = w_sum as i128;
                let w_var = n * w_sum_sq as i128 - w_sum * w_sum;

                let score = if w_var <= 0 {
                    0.0
                } else {
                    // Rounding recovers the exact integer sum of products.
                    let c = cross[y as usize * stride + x as usize].max(0.0).round() as i128;
                    let numerator = n * c - t_sum * w_sum;
                    let denominator = ((t_var as f64) * (w_var as f64)).sqrt();
                    (numerator as f64 / denominator).clamp(-1.0, 1.0)
                };

                if score > best.score {
                    best = MatchScore {
                        top_left: Point::new(x, y),
                        score,
                    };
                }
            }
        }

        Some(best)
    }

    fn spectrum(&self) -> &Spectrum {
        self.spectrum.get_or_init(|| Spectrum::new(self.image))
    }
}

/// 2D DFT of the search image plus the plans to correlate against it.
///
/// Transforms run at the search image's own size. Correlation is circular,
/// but a template placed at a valid alignment never wraps, so every value
/// the scan reads is the plain sum of products.
struct Spectrum {
    width: usize,
    height: usize,
    row_fwd: Arc<dyn Fft<f64>>,
    col_fwd: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
    image: Vec<Complex<f64>>,
}

impl Spectrum {
    fn new(img: &GrayImage) -> Self {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let mut planner = FftPlanner::<f64>::new();
        let mut spectrum = Self {
            width,
            height,
            row_fwd: planner.plan_fft_forward(width),
            col_fwd: planner.plan_fft_forward(height),
            row_inv: planner.plan_fft_inverse(width),
            col_inv: planner.plan_fft_inverse(height),
            image: Vec::new(),
        };

        let mut data: Vec<Complex<f64>> = img
            .as_raw()
            .iter()
            .map(|&v| Complex::new(v as f64, 0.0))
            .collect();
        spectrum.transform(&mut data, false);
        spectrum.image = data;
        spectrum
    }

    /// Sum of products of `template` with the window at every offset,
    /// indexed `y * width + x`.
    fn correlate(&self, template: &Template) -> Vec<f64> {
        let (w, h) = (self.width, self.height);
        let tw = template.width() as usize;

        let mut data = vec![Complex::new(0.0, 0.0); w * h];
        for (row, pixels) in template.image().as_raw().chunks_exact(tw).enumerate() {
            for (x, &v) in pixels.iter().enumerate() {
                data[row * w + x] = Complex::new(v as f64, 0.0);
            }
        }

        self.transform(&mut data, false);
        for (t, s) in data.iter_mut().zip(&self.image) {
            *t = s * t.conj();
        }
        self.transform(&mut data, true);

        let scale = 1.0 / (w * h) as f64;
        data.into_iter().map(|c| c.re * scale).collect()
    }

    /// Row transforms, then column transforms on a transposed copy.
    fn transform(&self, data: &mut [Complex<f64>], inverse: bool) {
        let (w, h) = (self.width, self.height);
        let (rows, cols) = if inverse {
            (&self.row_inv, &self.col_inv)
        } else {
            (&self.row_fwd, &self.col_fwd)
        };

        rows.process(data);

        let mut columns = vec![Complex::new(0.0, 0.0); w * h];
        for y in 0..h {
            for x in 0..w {
                columns[x * h + y] = data[y * w + x];
            }
        }
        cols.process(&mut columns);
        for x in 0..w {
            for y in 0..h {
                data[y * w + x] = columns[x * h + y];
            }
        }
    }
}

/// Summed-area tables of pixel values and squared pixel values
struct IntegralImage {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sum_sq = vec![0u64; stride * (h + 1)];
        let raw = img.as_raw();

        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_sum_sq = 0u64;
            for x in 0..w {
                let v = raw[y * w + x] as u64;
                row_sum += v;
                row_sum_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row_sum;
                sum_sq[i] = sum_sq[i - stride] + row_sum_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// (sum, sum of squares) over the `w` x `h` window at (x, y)
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (u64, u64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let s = self.stride;
        let rect = |t: &[u64]| t[y1 * s + x1] + t[y0 * s + x0] - t[y0 * s + x1] - t[y1 * s + x0];
        (rect(self.sum.as_slice()), rect(self.sum_sq.as_slice()))
    }
}
