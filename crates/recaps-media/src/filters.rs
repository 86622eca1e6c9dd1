//! Filter graph construction for the vertical-video composite.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// ASS style applied to burned-in subtitles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font_name: String,
    pub font_size: u32,
    /// `&HBBGGRR` colour of the text
    pub primary_colour: String,
    pub outline_colour: String,
    pub outline: u32,
    pub shadow: u32,
    pub bold: bool,
    /// Numpad-style alignment (2 = bottom centre)
    pub alignment: u32,
    pub margin_v: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial Black".to_string(),
            font_size: 32,
            primary_colour: "&Hffffff".to_string(),
            outline_colour: "&H000000".to_string(),
            outline: 3,
            shadow: 2,
            bold: true,
            alignment: 2,
            margin_v: 100,
        }
    }
}

impl SubtitleStyle {
    /// Value for the `subtitles` filter's `force_style` option.
    pub fn force_style(&self) -> String {
        format!(
            "FontName={},FontSize={},PrimaryColour={},OutlineColour={},Outline={},Shadow={},Bold={},Alignment={},MarginV={}",
            self.font_name,
            self.font_size,
            self.primary_colour,
            self.outline_colour,
            self.outline,
            self.shadow,
            u8::from(self.bold),
            self.alignment,
            self.margin_v
        )
    }
}

/// A static `drawtext` overlay (corner emoji and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    pub text: String,
    pub font_size: u32,
    pub font_color: String,
    /// drawtext x expression
    pub x: String,
    /// drawtext y expression
    pub y: String,
    pub alpha: f32,
}

impl Decoration {
    pub fn new(text: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: 32,
            font_color: "white".to_string(),
            x: x.into(),
            y: y.into(),
            alpha: 0.8,
        }
    }

    /// The two corner emoji shown on every video.
    pub fn defaults() -> Vec<Decoration> {
        vec![
            Decoration::new("🔥", "60", "100"),
            Decoration::new("⚡", "w-100", "100"),
        ]
    }

    fn to_filter(&self) -> String {
        format!(
            "drawtext=text='{}':fontsize={}:fontcolor={}:x={}:y={}:alpha={}",
            escape_drawtext(&self.text),
            self.font_size,
            self.font_color,
            self.x,
            self.y,
            format_number(self.alpha as f64)
        )
    }
}

/// How the output audio is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioMix {
    /// Voice (input 1) mixed over attenuated background audio (input 0)
    VoiceOverBackground { voice_gain: f64, background_gain: f64 },
    /// Voice only (the background has no audio stream)
    VoiceOnly { voice_gain: f64 },
    /// Attenuated background audio only (no voice track)
    BackgroundOnly { background_gain: f64 },
    /// No audio at all
    Silent,
}

impl AudioMix {
    /// Pick the mix for the available audio sources.
    pub fn select(has_voice: bool, background_has_audio: bool, voice_gain: f64, background_gain: f64) -> Self {
        match (has_voice, background_has_audio) {
            (true, true) => AudioMix::VoiceOverBackground {
                voice_gain,
                background_gain,
            },
            (true, false) => AudioMix::VoiceOnly { voice_gain },
            (false, true) => AudioMix::BackgroundOnly { background_gain },
            (false, false) => AudioMix::Silent,
        }
    }
}

/// Inputs to [`build_composite_filter`].
#[derive(Debug, Clone)]
pub struct CompositeFilter<'a> {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// SRT to burn in; `None` renders without captions
    pub subtitles: Option<(&'a Path, &'a SubtitleStyle)>,
    pub decorations: &'a [Decoration],
    pub audio: AudioMix,
}

/// Output label of the final video stream.
pub const VIDEO_OUT: &str = "[final_video]";
/// Output label of the mixed audio stream.
pub const AUDIO_OUT: &str = "[audio_out]";

/// A built `-filter_complex` graph and the labels to map.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub graph: String,
    pub video_label: &'static str,
    pub audio_label: Option<&'static str>,
}

/// Build the composite graph: letterboxed scale to the target frame, fps
/// normalisation, optional subtitle burn-in, decorations and the audio mix.
pub fn build_composite_filter(params: &CompositeFilter<'_>) -> FilterGraph {
    let mut video_stages = vec![format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,fps={fps}",
        w = params.width,
        h = params.height,
        fps = params.fps
    )];

    if let Some((path, style)) = params.subtitles {
        video_stages.push(format!(
            "subtitles='{}':force_style='{}'",
            escape_filter_path(path),
            style.force_style()
        ));
    }

    video_stages.extend(params.decorations.iter().map(Decoration::to_filter));

    let last = video_stages.len() - 1;
    let mut chains: Vec<String> = video_stages
        .into_iter()
        .enumerate()
        .map(|(i, stage)| {
            let input = if i == 0 { "[0:v]".to_string() } else { format!("[v{}]", i) };
            let output = if i == last { VIDEO_OUT.to_string() } else { format!("[v{}]", i + 1) };
            format!("{}{}{}", input, stage, output)
        })
        .collect();

    let audio_label = match params.audio {
        AudioMix::VoiceOverBackground {
            voice_gain,
            background_gain,
        } => {
            chains.push(format!("[1:a]volume={}[voice_audio]", format_number(voice_gain)));
            chains.push(format!("[0:a]volume={}[bg_audio]", format_number(background_gain)));
            chains.push(format!(
                "[voice_audio][bg_audio]amix=inputs=2:duration=first:dropout_transition=3{}",
                AUDIO_OUT
            ));
            Some(AUDIO_OUT)
        }
        AudioMix::VoiceOnly { voice_gain } => {
            chains.push(format!("[1:a]volume={}{}", format_number(voice_gain), AUDIO_OUT));
            Some(AUDIO_OUT)
        }
        AudioMix::BackgroundOnly { background_gain } => {
            chains.push(format!("[0:a]volume={}{}", format_number(background_gain), AUDIO_OUT));
            Some(AUDIO_OUT)
        }
        AudioMix::Silent => None,
    };

    FilterGraph {
        graph: chains.join(";"),
        video_label: VIDEO_OUT,
        audio_label,
    }
}

/// Escaped apostrophe for a value wrapped in single quotes.
///
/// Quotes take no escapes in the graph parser, so the quote is closed, the
/// apostrophe is escaped for both parsing levels, and the quote reopened.
const QUOTED_APOSTROPHE: &str = r"'\\\''";

/// Escape a path for use inside a single-quoted filter option.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', QUOTED_APOSTROPHE)
}

/// Escape text for drawtext's single-quoted `text` option.
fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('%', "\\%")
        .replace('\'', QUOTED_APOSTROPHE)
}

/// `1.0`, `0.2`, `0.25`: at least one decimal, no trailing zeros beyond it.
fn format_number(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(
        subtitles: Option<(&'a Path, &'a SubtitleStyle)>,
        decorations: &'a [Decoration],
        audio: AudioMix,
    ) -> CompositeFilter<'a> {
        CompositeFilter {
            width: 1080,
            height: 1920,
            fps: 30,
            subtitles,
            decorations,
            audio,
        }
    }

    #[test]
    fn test_full_graph() {
        let style = SubtitleStyle::default();
        let decorations = Decoration::defaults();
        let srt = Path::new("/tmp/job/subtitles.srt");
        let graph = build_composite_filter(&params(
            Some((srt, &style)),
            &decorations,
            AudioMix::select(true, true, 1.0, 0.2),
        ));

        assert_eq!(
            graph.graph,
            "[0:v]scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2:black,fps=30[v1];\
             [v1]subtitles='/tmp/job/subtitles.srt':force_style='FontName=Arial Black,FontSize=32,PrimaryColour=&Hffffff,OutlineColour=&H000000,Outline=3,Shadow=2,Bold=1,Alignment=2,MarginV=100'[v2];\
             [v2]drawtext=text='🔥':fontsize=32:fontcolor=white:x=60:y=100:alpha=0.8[v3];\
             [v3]drawtext=text='⚡':fontsize=32:fontcolor=white:x=w-100:y=100:alpha=0.8[final_video];\
             [1:a]volume=1.0[voice_audio];\
             [0:a]volume=0.2[bg_audio];\
             [voice_audio][bg_audio]amix=inputs=2:duration=first:dropout_transition=3[audio_out]"
        );
        assert_eq!(graph.audio_label, Some(AUDIO_OUT));
    }

    #[test]
    fn test_no_captions_no_decorations_silent() {
        let graph = build_composite_filter(&params(None, &[], AudioMix::Silent));
        assert_eq!(
            graph.graph,
            "[0:v]scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2:black,fps=30[final_video]"
        );
        assert_eq!(graph.audio_label, None);
    }

    #[test]
    fn test_audio_variants() {
        let voice_only = build_composite_filter(&params(None, &[], AudioMix::select(true, false, 1.0, 0.2)));
        assert!(voice_only.graph.ends_with("[1:a]volume=1.0[audio_out]"));
        assert!(!voice_only.graph.contains("[0:a]"));

        let background_only =
            build_composite_filter(&params(None, &[], AudioMix::select(false, true, 1.0, 0.25)));
        assert!(background_only.graph.ends_with("[0:a]volume=0.25[audio_out]"));
        assert!(!background_only.graph.contains("[1:a]"));
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\renders\\it's.srt")),
            r"C\:/renders/it'\\\''s.srt"
        );
    }

    /// One level of FFmpeg tokenizing: quotes are literal, `\` escapes
    /// the next character outside them.
    fn unquote(value: &str) -> String {
        let mut out = String::new();
        let mut quoted = false;
        let mut chars = value.chars();
        while let Some(c) = chars.next() {
            match c {
                '\'' => quoted = !quoted,
                '\\' if !quoted => out.extend(chars.next()),
                _ => out.push(c),
            }
        }
        out
    }

    #[test]
    fn test_quoted_path_survives_both_parsing_levels() {
        for raw in ["/tmp/it's here/captions.srt", "/tmp/a:b/captions.srt", "/tmp/''/x.srt"] {
            let option = format!("'{}'", escape_filter_path(Path::new(raw)));
            assert_eq!(unquote(&unquote(&option)), raw, "option {}", option);
        }
    }

    #[test]
    fn test_drawtext_apostrophe() {
        let filter = Decoration::new("it's 100%", "0", "0").to_filter();
        assert!(filter.starts_with(r"drawtext=text='it'\\\''s 100\%':"), "{}", filter);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1.0");
        assert_eq!(format_number(0.2), "0.2");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(2.0), "2.0");
    }
}
