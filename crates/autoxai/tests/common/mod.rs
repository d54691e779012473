//! Fixtures shared by the integration tests.

use std::io;
use std::sync::{Arc, Mutex};

use burn::prelude::*;
use burn::tensor::module::interpolate;
use burn::tensor::ops::{InterpolateMode, InterpolateOptions};

/// 40x45 pixel art, one character per pixel.
const PIKACHU: [&str; 45] = [
    "wwwwcwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwww",
    "wwwchcwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwww",
    "wwwchcwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwww",
    "wwwchhcwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwww",
    "wwchhhcwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwww",
    "wwchhhfwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwwww",
    "wwchgbfwwwwwwwwwwwwwwwwwhhhhwwwwwwwwwwww",
    "wwcgbbbfwwwwwwwwwwwwwhhhgggghcwwwwwwwwww",
    "wwcbbbbfwwwwwwwwwwwddbaagggggcwwwwwwwwww",
    "wwcbbbbfwwddddwwwddaaaaaggggcwwwwwwwwwww",
    "wwwfbbbddeiiiaaedaaaaaaggggcwwwwwwwwwwww",
    "wwwfbbeeiiiiiiaaaaaaaaaggccwwwwwwwddwwww",
    "wwwwfeaiiiiiiaaaaaaaaacccwwwwwwwwdaadwww",
    "wwwwdaaaaaaaabccbaaedcwwwwwwwwwwdaaaadww",
    "wwwfecbaaaaaagwchaaacwwwwwwwwwweaaaaadww",
    "wwwfcwbaaaaaaccghaaacwwwwwwwwweaaaaaaadw",
    "wwwfgcaafeaaabccbaaadwwwwwwweeaaaaaaaadw",
    "wwwdhdaaaaaaaaaaajjaefwwwwwdaaaaaaaaaadw",
    "wwfaaaaafdeaaaaajjjjbcwwwwdaaaaaaaaaaaad",
    "wwfjbaefdbbddeabjjjjbcwwwdaaaaaaaaaaaaad",
    "wwfjbbbbbbbbbbbbjjjjbcwwwdbaaaaaaaaaaaad",
    "wwfbbbbbbbbbbbbbbbjjbcwwdbbbbaaaaaaaaacw",
    "wwwdbbbbbbbbbbbbbbbbbcwdbbbbbbbaaaaaccww",
    "wwwwcbbbbbbbbbbbbbbbbfwdbbbbbbbbbaccwwww",
    "wwwwcbbbbbbbbbbbbbbbbacdfbbbbbbbccwwwwww",
    "wwwwcabbbbbbbbbbbbbbaacwwfbbbbccwwwwwwww",
    "wwwwcaaabbbbbbbbbbbaaacwwwfbbdwwwwwwwwww",
    "wwwwcaaaaabbbbbebaaaaacwwwwfbbfwwwwwwwww",
    "wwwwcaadaaaaaaeaaaaaaafwwwcebbfwwwwwwwww",
    "wwwcaaaeaaaaaaeaaaaaaaacwcebbbbfwwwwwwww",
    "wwwcaaaadaaaadaaaaabaaacfeeebefcwwwwwwww",
    "wwwceaaadaaaadaaaabeaabceeeeffwwwwwwwwww",
    "wwwcdaaaeaaadaaaaadeaabcceecwwwwwwwwwwww",
    "wwwcdaaaadaaceaaadaaabbbccddcwwwwwwwwwww",
    "wwcaadaedaaaacaedaaaabbbcwcddcwwwwwwwwww",
    "wwdaaaddaaaaaaddaaaabbbbccdddcwwwwwwwwww",
    "wcbaaaaaaaaaaaaaaababbbbffdccwwwwwwwwwww",
    "wcbbaaaaaaaaaaaaabababbbbccwwwwwwwwwwwww",
    "wcbbbbbaaaaaaabbbababbbbbcwwwwwwwwwwwwww",
    "wwdbbbbbbbbbbbbbbbbbbbbbfwwwwwwwwwwwwwww",
    "wwcbbbbbbbbbbbbbbbbbbbbecwwwwwwwwwwwwwww",
    "wwwccbbbeeccccfbbbbbbbecwwwwwwwwwwwwwwww",
    "wwcfeddddcwwwwwcfddeedcwwwwwwwwwwwwwwwww",
    "wcadaefccwwwwwwwwwfbbbdcwwwwwwwwwwwwwwww",
    "wwccccwwwwwwwwwwwwwwcccdacwwwwwwwwwwwwww",
];

fn palette(pixel: char) -> [u8; 3] {
    match pixel {
        'c' => [0, 0, 0],
        'h' => [50, 50, 50],
        'g' => [90, 90, 90],
        'f' => [139, 69, 19],
        'a' => [255, 232, 122],
        'b' => [255, 210, 100],
        'd' => [205, 133, 63],
        'e' => [255, 165, 0],
        'i' => [255, 255, 153],
        'j' => [255, 0, 0],
        _ => [255, 255, 255],
    }
}

/// The pixel art as a grayscale batch of one, `(1, 1, size, size)`.
///
/// The shorter side is resized to `size` and the longer one center-cropped,
/// values in `[0, 1]`.
pub fn pikachu<B: Backend>(size: usize, device: &B::Device) -> Tensor<B, 4> {
    let height = PIKACHU.len();
    let width = PIKACHU[0].len();

    let gray: Vec<f32> = PIKACHU
        .iter()
        .flat_map(|row| row.chars())
        .map(|pixel| {
            let [r, g, b] = palette(pixel);
            (0.2989 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0
        })
        .collect();
    let image = Tensor::<B, 1>::from_floats(gray.as_slice(), device).reshape([1, 1, height, width]);

    let scale = size as f32 / height.min(width) as f32;
    let resized_h = ((height as f32 * scale).round() as usize).max(size);
    let resized_w = ((width as f32 * scale).round() as usize).max(size);
    let resized = interpolate(
        image,
        [resized_h, resized_w],
        InterpolateOptions::new(InterpolateMode::Bilinear),
    );

    let top = (resized_h - size) / 2;
    let left = (resized_w - size) / 2;
    resized.slice([0..1, 0..1, top..top + size, left..left + size])
}

/// In-memory log sink for a `tracing_subscriber` fmt layer.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with every log event at `level` or above written to the returned buffer.
pub fn capture_logs<R>(level: tracing::Level, f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
