//! Scene job compilation into encoder invocations.
//!
//! A scene becomes one `ffmpeg` call: a solid canvas input, one input (or source filter) per
//! visible element, and a `-filter_complex` graph that applies each element's timing, static
//! transform and animation expressions before overlaying it at its window. Expressions are
//! evaluated by the encoder per frame, so animations compose there exactly as
//! [`crate::animation::anim::compose_at`] composes them.

use std::path::Path;

use crate::animation::anim::{Animation, Channel};
use crate::encode::engine::EncoderInvocation;
use crate::eval::timing::{PlaybackPolicy, ResolvedElement, ResolvedScene, SourcePlayback};
use crate::foundation::core::{Fps, Size, fmt_num};
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::color::Color;
use crate::scene::model::{Element, ElementKind, Scene, TextAlign, TextStyle};
use crate::scene::options::{CompositionOptions, VideoEncodingParams};

/// Frame capacity of the encoder's `loop` filter.
const MAX_LOOP_FRAMES: u64 = 32767;

/// Compile one scene into an encoder invocation writing an MP4 artifact to `output`.
///
/// Looping video elements trimmed at their start must have a known clip end (see
/// [`crate::render::job::SceneJob::prepare`]). Untrimmed loops repeat the input itself.
pub fn compile_scene(
    label: &str,
    scene: &Scene,
    resolved: &ResolvedScene,
    options: &CompositionOptions,
    output: &Path,
) -> FramecraftResult<EncoderInvocation> {
    let fps = options.fps()?;
    let f = fmt_num(fps.as_f64());
    let (w, h) = (options.frame_width, options.frame_height);

    let mut args = base_args(options);
    args.extend(strs([
        "-f",
        "lavfi",
        "-i",
        &format!(
            "color=c={}:s={w}x{h}:r={f}:d={}",
            resolved.background.to_ffmpeg(),
            fmt_num(resolved.duration)
        ),
    ]));

    let mut graph = Vec::new();
    let mut side_files = Vec::new();
    let mut base = "[0:v]".to_owned();
    let mut next_input = 1usize;

    for (element, r) in scene.elements().iter().zip(&resolved.elements) {
        if r.is_hidden() {
            continue;
        }
        let local = fmt_num(r.local_duration());
        let mut chain = Vec::new();
        let src = match element.kind() {
            ElementKind::Image { path } => {
                args.extend(strs(["-loop", "1", "-framerate", &f, "-t", &local, "-i"]));
                args.push(path.to_string_lossy().into_owned());
                chain.push(format!("trim=duration={local}"));
                chain.push("setpts=PTS-STARTPTS".to_owned());
                take_input(&mut next_input)
            }
            ElementKind::Gif { path } => {
                args.extend(strs(["-ignore_loop", "0", "-i"]));
                args.push(path.to_string_lossy().into_owned());
                chain.push(format!("fps={f}"));
                chain.push(format!("trim=duration={local}"));
                chain.push("setpts=PTS-STARTPTS".to_owned());
                take_input(&mut next_input)
            }
            ElementKind::Video(v) => {
                let playback = r.playback.ok_or_else(|| {
                    FramecraftError::config(format!(
                        "{label}: element {} has no resolved playback",
                        r.index
                    ))
                })?;
                if playback.policy == PlaybackPolicy::Wrap && playback.whole_source {
                    args.extend(strs(["-stream_loop", "-1"]));
                } else if playback.clip_start > 0.0 {
                    args.extend(strs(["-ss", &fmt_num(playback.clip_start)]));
                }
                args.push("-i".to_owned());
                args.push(v.path.to_string_lossy().into_owned());
                chain.extend(video_timing(label, r.index, &playback, fps)?);
                take_input(&mut next_input)
            }
            ElementKind::Text(t) => {
                let text_path = output.with_extension(format!("e{}.txt", r.index));
                side_files.push((text_path.clone(), t.text.clone()));
                let (tw, th) = text_canvas(t, element.size());
                let canvas = t.background_color.unwrap_or(Color::TRANSPARENT);
                chain.push(format!(
                    "color=c={}:s={tw}x{th}:r={f}:d={local}",
                    canvas.to_ffmpeg()
                ));
                chain.push("format=rgba".to_owned());
                chain.push(drawtext(t, &text_path));
                String::new()
            }
        };

        if !matches!(element.kind(), ElementKind::Text(_)) {
            chain.push("format=rgba".to_owned());
            if let Some(size) = element.size() {
                let (sw, sh) = even_size(size);
                chain.push(format!("scale={sw}:{sh}"));
            }
        }
        chain.extend(transform_filters(element, r));
        chain.push(format!(
            "setpts=PTS-STARTPTS+{}/TB",
            fmt_num(r.window.start)
        ));

        let layer = format!("[e{}]", r.index);
        graph.push(format!("{src}{}{layer}", chain.join(",")));

        let out = format!("[v{}]", r.index);
        let local_t = format!("(t-{})", fmt_num(r.window.start));
        let axis = |ch: Channel, base: f64| {
            channel_expr(
                element.animations(),
                ch,
                base,
                Combine::Add,
                r.local_duration(),
                &local_t,
            )
        };
        let x = axis(Channel::TranslateX, element.position().x);
        let y = axis(Channel::TranslateY, element.position().y);
        graph.push(format!(
            "{base}{layer}overlay=x='{x}-overlay_w/2':y='{y}-overlay_h/2'\
             :enable='gte(t,{})*lt(t,{})':eof_action=pass{out}",
            fmt_num(r.window.start),
            fmt_num(r.window.end)
        ));
        base = out;
    }

    graph.push(format!(
        "{base}format={}[vout]",
        options.video_encoding_params.pixel_format
    ));

    args.extend(strs(["-filter_complex", &graph.join(";"), "-map", "[vout]"]));
    args.extend(strs(["-t", &fmt_num(resolved.duration), "-r", &f]));
    args.extend(video_codec_args(&options.video_encoding_params));
    args.extend(strs(["-an", "-f", "mp4"]));
    args.push(output.to_string_lossy().into_owned());

    Ok(EncoderInvocation {
        label: label.to_owned(),
        args,
        output: output.to_owned(),
        side_files,
    })
}

/// Leading arguments shared by every invocation.
pub(crate) fn base_args(options: &CompositionOptions) -> Vec<String> {
    let level = if options.logging_enabled { "info" } else { "error" };
    strs(["-y", "-hide_banner", "-nostdin", "-loglevel", level])
}

/// Video codec arguments for `params`.
pub(crate) fn video_codec_args(params: &VideoEncodingParams) -> Vec<String> {
    let mut a = strs(["-c:v", &params.codec]);
    if let Some(p) = &params.preset {
        a.extend(strs(["-preset", p]));
    }
    match (&params.bitrate, params.quality_factor) {
        (Some(b), _) => a.extend(strs(["-b:v", b])),
        (None, Some(q)) => a.extend(strs(["-crf", &q.to_string()])),
        (None, None) => {}
    }
    if let Some(p) = &params.profile {
        a.extend(strs(["-profile:v", p]));
    }
    if let Some(l) = &params.level {
        a.extend(strs(["-level", l]));
    }
    if let Some(m) = &params.max_bitrate {
        a.extend(strs(["-maxrate", m]));
    }
    if let Some(b) = &params.buffer_size {
        a.extend(strs(["-bufsize", b]));
    }
    if let Some(g) = params.keyframe_interval {
        a.extend(strs(["-g", &g.to_string()]));
    }
    a.extend(strs(["-pix_fmt", &params.pixel_format]));
    a
}

pub(crate) fn strs<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn take_input(next: &mut usize) -> String {
    let label = format!("[{next}:v]");
    *next += 1;
    label
}

fn video_timing(
    label: &str,
    index: usize,
    p: &SourcePlayback,
    fps: Fps,
) -> FramecraftResult<Vec<String>> {
    let play = fmt_num(p.play_secs);
    let mut v = vec![format!("fps={}", fmt_num(fps.as_f64()))];
    match p.policy {
        PlaybackPolicy::Truncate => {
            v.push(format!("trim=duration={play}"));
            v.push("setpts=PTS-STARTPTS".to_owned());
        }
        PlaybackPolicy::HoldLastFrame => {
            if let Some(len) = p.clip_len() {
                v.push(format!("trim=duration={}", fmt_num(len)));
            }
            v.push("setpts=PTS-STARTPTS".to_owned());
            v.push(format!("tpad=stop_mode=clone:stop_duration={play}"));
            v.push(format!("trim=duration={play}"));
        }
        PlaybackPolicy::Wrap if p.whole_source => {
            v.push(format!("trim=duration={play}"));
            v.push("setpts=PTS-STARTPTS".to_owned());
        }
        PlaybackPolicy::Wrap => {
            let len = p.clip_len().ok_or_else(|| {
                FramecraftError::config(format!(
                    "{label}: looping element {index} needs a known clip end"
                ))
            })?;
            let frames = fps.secs_to_frames_ceil(len).max(1);
            if frames > MAX_LOOP_FRAMES {
                return Err(FramecraftError::config(format!(
                    "{label}: looping element {index} spans {frames} frames, over the \
                     {MAX_LOOP_FRAMES}-frame limit for trimmed loops; loop the untrimmed source \
                     or shorten the clip"
                )));
            }
            v.push(format!("trim=duration={}", fmt_num(len)));
            v.push("setpts=PTS-STARTPTS".to_owned());
            v.push(format!("loop=loop=-1:size={frames}:start=0"));
            v.push("setpts=N/FRAME_RATE/TB".to_owned());
            v.push(format!("trim=duration={play}"));
        }
    }
    Ok(v)
}

fn transform_filters(element: &Element, r: &ResolvedElement) -> Vec<String> {
    let anims = element.animations();
    let dur = r.local_duration();
    let touched = |ch: Channel| anims.iter().any(|a| a.kind.channel(ch).is_some());
    let mut out = Vec::new();

    if element.scale() != 1.0 || touched(Channel::Scale) {
        let s = channel_expr(anims, Channel::Scale, element.scale(), Combine::Mul, dur, "t");
        let eval = if touched(Channel::Scale) { ":eval=frame" } else { "" };
        out.push(format!(
            "scale=w='max(2,trunc(iw*({s})/2)*2)':h='max(2,trunc(ih*({s})/2)*2)'{eval}"
        ));
    }
    if element.rotation_deg() != 0.0 || touched(Channel::Rotation) {
        let a = channel_expr(
            anims,
            Channel::Rotation,
            element.rotation_deg(),
            Combine::Add,
            dur,
            "t",
        );
        out.push(format!(
            "rotate=a='({a})*PI/180':c=none:ow='hypot(iw,ih)':oh=ow"
        ));
    }
    if touched(Channel::Opacity) {
        let o = channel_expr(anims, Channel::Opacity, 1.0, Combine::Mul, dur, "T");
        out.push(format!(
            "geq=r='r(X,Y)':g='g(X,Y)':b='b(X,Y)':a='alpha(X,Y)*({o})'"
        ));
    }
    out
}

#[derive(Clone, Copy)]
enum Combine {
    Add,
    Mul,
}

/// Per-frame expression for one transform channel: `base` combined with every animation that
/// drives the channel, in list order.
fn channel_expr(
    anims: &[Animation],
    ch: Channel,
    base: f64,
    combine: Combine,
    element_duration: f64,
    time_var: &str,
) -> String {
    let op = match combine {
        Combine::Add => "+",
        Combine::Mul => "*",
    };
    let mut expr = fmt_num(base);
    for a in anims {
        let Some((from, to)) = a.kind.channel(ch) else {
            continue;
        };
        let w = a.window(element_duration);
        let p = format!(
            "clip(({time_var}-({}))/{},0,1)",
            fmt_num(w.start),
            fmt_num(a.time)
        );
        expr = format!(
            "{expr}{op}({}+({})*{})",
            fmt_num(from),
            fmt_num(to - from),
            a.ease.expr(&p)
        );
    }
    expr
}

fn even_size(size: Size) -> (u32, u32) {
    let even = |v: f64| ((v.round() as u32) / 2 * 2).max(2);
    (even(size.width), even(size.height))
}

/// Canvas for a text element: its explicit size, or an estimate from the font size.
fn text_canvas(t: &TextStyle, size: Option<Size>) -> (u32, u32) {
    if let Some(s) = size {
        return even_size(s);
    }
    let lines = t.text.lines().count().max(1) as f64;
    let widest = t
        .text
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0) as f64;
    let border = t.border.map_or(0.0, |b| b.width * 2.0);
    even_size(Size::new(
        widest * t.font_size * 0.6 + t.font_size + border,
        lines * t.font_size * 1.25 + t.font_size * 0.5 + border,
    ))
}

fn drawtext(t: &TextStyle, text_path: &Path) -> String {
    let pad = fmt_num(t.font_size * 0.5);
    let x = match t.alignment {
        TextAlign::Left => pad,
        TextAlign::Center => "(w-text_w)/2".to_owned(),
        TextAlign::Right => format!("w-text_w-{pad}"),
    };
    let mut s = format!(
        "drawtext=textfile={}:fontsize={}:fontcolor={}:x={x}:y=(h-text_h)/2",
        escape_filter_value(&text_path.to_string_lossy()),
        fmt_num(t.font_size),
        t.color.to_ffmpeg()
    );
    if let Some(b) = t.border {
        s.push_str(&format!(
            ":borderw={}:bordercolor={}",
            fmt_num(b.width),
            b.color.to_ffmpeg()
        ));
    }
    if let Some(font) = &t.font_file {
        s.push_str(&format!(
            ":fontfile={}",
            escape_filter_value(&font.to_string_lossy())
        ));
    }
    s
}

/// Escape a literal for use as a filter option value inside `-filter_complex`.
///
/// Two levels apply: option values (`\ ' :`) and then the graph syntax (`\ ' [ ] , ;`).
pub(crate) fn escape_filter_value(s: &str) -> String {
    let mut value = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            value.push('\\');
        }
        value.push(c);
    }
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/compile/filter_graph.rs"]
mod tests;
