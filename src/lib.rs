use std::{
    env, fs,
    path::{Path, PathBuf},
};

use ab_glyph::{point, FontVec, Point, PxScale};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use nanorand::{Rng, WyRand};
use palette::{Hsl, IntoColor, Pixel, Srgb};
use sat::Rect;
use text::GlyphData;
use tracing::debug;

pub use chart::{Chart, ChartKind};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use frequency::{FilteredFrequencyTable, FrequencyTable, WordCount};
pub use mask::MaskImage;
pub use normalize::Normalizer;
pub use pipeline::{AnalysisReport, AnalysisRequest, Pipeline};
pub use stopwords::StopwordSet;
pub use tokenizer::{ChineseTokenizer, Segmenter};

pub mod chart;
pub mod config;
mod error;
pub mod fetch;
pub mod frequency;
pub mod mask;
pub mod normalize;
pub mod pipeline;
mod sat;
pub mod stopwords;
mod text;
pub mod tokenizer;
pub mod web;

// 配置的字体找不到时依次尝试, 中文字体在前
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
    "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// 字体查找顺序: 配置的路径, 环境变量 WFREQ_FONT, 然后是常见的系统字体
pub fn font_candidates(preferred: Option<&Path>) -> Vec<PathBuf> {
    preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(env::var_os("WFREQ_FONT").map(PathBuf::from))
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
        .collect()
}

pub struct Word<'a> {
    pub text: &'a str,
    pub font: &'a FontVec,
    pub font_size: PxScale,
    pub glyphs: GlyphData,
    pub rotated: bool,
    pub position: Point,
    pub frequency: f32,
    pub index: usize,
}

pub enum WordCloudSize {
    FromDimensions { width: u32, height: u32 },
    /// 掩模占用图, 非 0 的像素不放字
    FromMask(GrayImage),
}

pub struct WordCloud {
    background_color: Rgba<u8>,
    pub font: FontVec,
    min_font_size: f32,
    max_font_size: Option<f32>,
    font_step: f32,
    word_margin: u32,
    word_rotate_chance: f64,
    relative_font_scaling: f32,
    max_words: usize,
    rng_seed: Option<u64>,
}

impl WordCloud {
    pub fn new(font: FontVec) -> Self {
        WordCloud {
            background_color: Rgba([0, 0, 0, 255]),
            font,
            min_font_size: 4.0,
            max_font_size: None,
            font_step: 1.0,
            word_margin: 2,
            word_rotate_chance: 0.10,
            relative_font_scaling: 0.5,
            max_words: 200,
            rng_seed: None,
        }
    }

    pub fn from_font_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let font_file =
            fs::read(path).map_err(|e| Error::Font(format!("{}: {e}", path.display())))?;
        let font = FontVec::try_from_vec(font_file)
            .map_err(|e| Error::Font(format!("{}: {e}", path.display())))?;

        Ok(Self::new(font))
    }

    /// 返回第一个能加载的字体和它的路径
    pub fn from_font_candidates(
        candidates: impl IntoIterator<Item = PathBuf>,
    ) -> Result<(Self, PathBuf)> {
        let mut tried = vec![];
        for path in candidates {
            match Self::from_font_path(&path) {
                Ok(cloud) => return Ok((cloud, path)),
                Err(e) => {
                    debug!(error = %e, "font not usable");
                    tried.push(path.display().to_string());
                }
            }
        }

        Err(Error::Font(format!("no usable font, tried: {}", tried.join(", "))))
    }

    pub fn with_background_color(mut self, value: Rgba<u8>) -> Self {
        self.background_color = value;
        self
    }

    pub fn with_min_font_size(mut self, value: f32) -> Self {
        self.min_font_size = value;
        self
    }

    pub fn with_max_font_size(mut self, value: Option<f32>) -> Self {
        self.max_font_size = value;
        self
    }

    pub fn with_font_step(mut self, value: f32) -> Self {
        self.font_step = value;
        self
    }

    pub fn with_word_margin(mut self, value: u32) -> Self {
        self.word_margin = value;
        self
    }

    pub fn with_word_rotate_chance(mut self, value: f64) -> Self {
        self.word_rotate_chance = value;
        self
    }

    pub fn with_relative_font_scaling(mut self, value: f32) -> Self {
        self.relative_font_scaling = value;
        self
    }

    pub fn with_max_words(mut self, value: usize) -> Self {
        self.max_words = value;
        self
    }

    pub fn with_rng_seed(mut self, value: Option<u64>) -> Self {
        self.rng_seed = value;
        self
    }

    fn generate_from_word_positions(
        rng: &mut WyRand,
        width: u32,
        height: u32,
        word_positions: Vec<Word>,
        background_color: Rgba<u8>,
        color_func: fn(&Word, &mut WyRand) -> Rgba<u8>,
    ) -> RgbaImage {
        let mut final_image_buffer = RgbaImage::from_pixel(width, height, background_color);

        for word in word_positions {
            let col = color_func(&word, rng);

            text::draw_glyphs_to_rgba_buffer(
                &mut final_image_buffer,
                &word.glyphs,
                word.font,
                word.position,
                word.rotated,
                col,
            )
        }

        final_image_buffer
    }

    // words 按词频从高到低排好, 词频归一化到 (0, 1]
    pub fn generate_from_frequencies(&self, words: &[(&str, f32)], size: WordCloudSize) -> RgbaImage {
        self.generate_from_frequencies_with_color_func(words, size, random_color_rgba)
    }

    pub fn generate_from_frequencies_with_color_func(
        &self,
        words: &[(&str, f32)],
        size: WordCloudSize,
        color_func: fn(&Word, &mut WyRand) -> Rgba<u8>,
    ) -> RgbaImage {
        let mut gray_buffer = match size {
            WordCloudSize::FromDimensions { width, height } => {
                GrayImage::from_pixel(width, height, Luma([0]))
            }
            WordCloudSize::FromMask(mask) => mask,
        };

        let mut rng = match self.rng_seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };

        let final_words = self.layout(words, &mut gray_buffer, &mut rng);
        debug!(placed = final_words.len(), requested = words.len(), "word cloud layout");

        WordCloud::generate_from_word_positions(
            &mut rng,
            gray_buffer.width(),
            gray_buffer.height(),
            final_words,
            self.background_color,
            color_func,
        )
    }

    fn layout<'a>(
        &'a self,
        words: &[(&'a str, f32)],
        gray_buffer: &mut GrayImage,
        rng: &mut WyRand,
    ) -> Vec<Word<'a>> {
        let (width, height) = gray_buffer.dimensions();
        let mut summed_area_table = vec![0u32; gray_buffer.as_raw().len()];
        sat::to_summed_area_table(
            &mut summed_area_table,
            gray_buffer.as_raw(),
            width as usize,
            0,
        );

        let first_word = match words.first() {
            Some(word) => word,
            None => return vec![],
        };

        //使用第一个词的长宽来作为参考
        let mut font_size = {
            let rect_at_image_height = self.text_dimensions_at_font_size(
                first_word.0,
                PxScale::from(height as f32 * 0.95),
            );

            let height_ration =
                rect_at_image_height.height as f32 / rect_at_image_height.width.max(1) as f32;
            let start_height = width as f32 * height_ration;

            start_height.min(height as f32 * 0.95)
        };
        if let Some(max) = self.max_font_size {
            font_size = font_size.min(max);
        }

        let limit = if self.max_words > 0 {
            self.max_words
        } else {
            words.len()
        };

        let mut final_words = Vec::with_capacity(limit.min(words.len()));
        let mut last_freq = first_word.1;

        for (index, &(text, frequency)) in words.iter().take(limit).enumerate() {
            if frequency <= 0.0 {
                continue;
            }

            let rs = self.relative_font_scaling;
            if rs != 0.0 && last_freq > 0.0 {
                font_size *= rs * (frequency / last_freq) + (1.0 - rs);
            }

            let mut rotated = self.roll_rotation(rng);
            let mut tried_other_orientation = false;

            let placement = loop {
                if font_size < self.min_font_size {
                    break None;
                }

                let scale = PxScale::from(font_size);
                let glyphs = text::text_to_glyphs(text, &self.font, scale);
                let (glyph_width, glyph_height) = glyphs.footprint(rotated);
                let rect = Rect {
                    width: glyph_width + self.word_margin,
                    height: glyph_height + self.word_margin,
                };

                if let Some(pos) =
                    sat::find_space_for_rect(&summed_area_table, width, height, &rect, rng)
                {
                    break Some((glyphs, pos, scale));
                }

                if !tried_other_orientation && self.word_rotate_chance > 0.0 {
                    rotated = !rotated;
                    tried_other_orientation = true;
                } else {
                    font_size -= self.font_step;
                    rotated = false;
                }
            };

            // 最小字号也放不下了
            let (glyphs, pos, scale) = match placement {
                Some(placement) => placement,
                None => break,
            };

            let half_margin = (self.word_margin / 2) as f32;
            let position = point(pos.x as f32 + half_margin, pos.y as f32 + half_margin);
            if let Some(row) = text::draw_glyphs_to_gray_buffer(
                gray_buffer,
                &glyphs,
                &self.font,
                position,
                rotated,
            ) {
                sat::to_summed_area_table(
                    &mut summed_area_table,
                    gray_buffer.as_raw(),
                    width as usize,
                    row as usize,
                );
            }

            final_words.push(Word {
                text,
                font: &self.font,
                font_size: scale,
                glyphs,
                rotated,
                position,
                frequency,
                index,
            });
            last_freq = frequency;
        }

        final_words
    }

    fn roll_rotation(&self, rng: &mut WyRand) -> bool {
        if self.word_rotate_chance <= 0.0 {
            return false;
        }
        let roll: u32 = rng.generate_range(0..1000);
        (roll as f64) < self.word_rotate_chance * 1000.0
    }

    fn text_dimensions_at_font_size(&self, text: &str, font_size: PxScale) -> Rect {
        let glyphs = text::text_to_glyphs(text, &self.font, font_size);
        Rect {
            width: glyphs.width + self.word_margin,
            height: glyphs.height + self.word_margin,
        }
    }
}

pub fn random_color_rgba(_: &Word, rng: &mut WyRand) -> Rgba<u8> {
    let hue: u8 = rng.generate_range(0..255);

    let col = Hsl::new(hue as f32, 1.0, 0.5);
    let rgb: Srgb = col.into_color();

    let raw: [u8; 3] = rgb.into_format().into_raw();

    Rgba([raw[0], raw[1], raw[2], 0xFF])
}
