/// Template matching implementation
///
/// Dense correlation over every top-left position followed by a global
/// maximum search.
use super::types::{CorrelationMethod, ScoreMap, ScoredLocation};
use image::{GrayImage, Luma};
use imageproc::template_matching::{MatchTemplateMethod, match_template};

/// Variance below this is treated as a flat patch with no defined correlation
const FLAT_EPSILON: f64 = 1e-9;

/// Template matcher for finding a template's best alignment in a frame
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMatcher {
    method: CorrelationMethod,
}

impl TemplateMatcher {
    pub fn new(method: CorrelationMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    /// Best alignment of `template` in `image`.
    ///
    /// Returns `None` when the template is empty or larger than the image in
    /// either dimension.
    pub fn best_for(&self, image: &GrayImage, template: &GrayImage) -> Option<ScoredLocation> {
        if !fits(image, template) {
            return None;
        }
        best_match(&correlation_map(image, template, self.method))
    }
}

fn fits(image: &GrayImage, template: &GrayImage) -> bool {
    template.width() > 0
        && template.height() > 0
        && template.width() <= image.width()
        && template.height() <= image.height()
}

/// Score every top-left position of `template` inside `image`.
///
/// The map is `(W − w + 1) × (H − h + 1)`; it is empty when the template does
/// not fit.
pub fn correlation_map(
    image: &GrayImage,
    template: &GrayImage,
    method: CorrelationMethod,
) -> ScoreMap {
    if !fits(image, template) {
        return ScoreMap::new(0, 0);
    }
    match method {
        CorrelationMethod::ZeroMeanNormalized => zero_mean_normalized(image, template),
        CorrelationMethod::CrossNormalized => {
            match_template(image, template, MatchTemplateMethod::CrossCorrelationNormalized)
        }
    }
}

/// Global maximum of a score map; the first maximum in row-major order wins.
pub fn best_match(map: &ScoreMap) -> Option<ScoredLocation> {
    let mut best: Option<ScoredLocation> = None;
    for (x, y, pixel) in map.enumerate_pixels() {
        let score = pixel[0];
        if score.is_nan() {
            continue;
        }
        if best.is_none_or(|b| score > b.score) {
            best = Some(ScoredLocation { x, y, score });
        }
    }
    best
}

/// Summed-area table of pixel values and squared values, `(w + 1) × (h + 1)`
struct IntegralSums {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralSums {
    fn new(image: &GrayImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..width {
                let v = u64::from(image.get_pixel(x as u32, y as u32)[0]);
                row += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// (Σv, Σv²) over the window with top-left (x, y)
    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (u64, u64) {
        let s = self.stride;
        let (a, b, c, d) = (y * s + x, y * s + x + w, (y + h) * s + x, (y + h) * s + x + w);
        (
            self.sum[d] + self.sum[a] - self.sum[b] - self.sum[c],
            self.sum_sq[d] + self.sum_sq[a] - self.sum_sq[b] - self.sum_sq[c],
        )
    }
}

fn zero_mean_normalized(image: &GrayImage, template: &GrayImage) -> ScoreMap {
    let (tw, th) = (template.width() as usize, template.height() as usize);
    let n = (tw * th) as f64;

    let template_mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
    let centered: Vec<f64> = template
        .pixels()
        .map(|p| f64::from(p[0]) - template_mean)
        .collect();
    let template_energy: f64 = centered.iter().map(|v| v * v).sum();

    let out_w = image.width() - template.width() + 1;
    let out_h = image.height() - template.height() + 1;
    let mut map = ScoreMap::new(out_w, out_h);
    if template_energy <= FLAT_EPSILON {
        return map;
    }

    let sums = IntegralSums::new(image);
    let stride = image.width() as usize;
    let raw = image.as_raw();

    for y in 0..out_h as usize {
        for x in 0..out_w as usize {
            let (s, s_sq) = sums.window(x, y, tw, th);
            let s = s as f64;
            let window_energy = s_sq as f64 - s * s / n;
            if window_energy <= FLAT_EPSILON {
                continue;
            }

            // Σ(I − Ī)(T − T̄) = Σ I·(T − T̄) because Σ(T − T̄) = 0
            let mut numerator = 0.0;
            for ty in 0..th {
                let row = &raw[(y + ty) * stride + x..(y + ty) * stride + x + tw];
                let trow = &centered[ty * tw..(ty + 1) * tw];
                for (iv, tv) in row.iter().zip(trow) {
                    numerator += f64::from(*iv) * tv;
                }
            }

            let score = numerator / (window_energy * template_energy).sqrt();
            map.put_pixel(x as u32, y as u32, Luma([score.clamp(-1.0, 1.0) as f32]));
        }
    }
    map
}
