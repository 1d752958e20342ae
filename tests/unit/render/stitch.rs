use super::*;
use crate::compile::fingerprint::Fingerprint;

fn artifact(index: usize) -> Artifact {
    Artifact {
        index,
        fingerprint: Fingerprint {
            hi: index as u64,
            lo: 0,
        },
        path: PathBuf::from(format!("/cache/{index}.mp4")),
        cache_hit: false,
        produced: true,
    }
}

fn scene(duration: f64, transition: Option<(&str, f64)>) -> Scene {
    let mut s = Scene::new();
    s.set_duration(duration).unwrap();
    if let Some((name, ms)) = transition {
        s.set_transition(name, ms).unwrap();
    }
    s
}

fn encode(plan: StitchPlan) -> EncoderInvocation {
    match plan {
        StitchPlan::Encode(inv) => inv,
        StitchPlan::Copy(p) => panic!("expected an encode, got a copy of {}", p.display()),
    }
}

fn graph(inv: &EncoderInvocation) -> &str {
    let at = inv.args.iter().position(|a| a == "-filter_complex").unwrap();
    &inv.args[at + 1]
}

#[test]
fn single_scene_without_audio_is_copied() {
    let plan = plan_stitch(
        &[artifact(0)],
        &[scene(3.0, Some(("fade", 500.0)))],
        None,
        &CompositionOptions::default(),
        Path::new("/out/.staging.partial"),
    )
    .unwrap();
    assert_eq!(plan, StitchPlan::Copy(PathBuf::from("/cache/0.mp4")));
}

#[test]
fn transitions_overlap_and_cuts_concatenate() {
    let scenes = [
        scene(3.0, Some(("fade", 1000.0))),
        scene(4.0, None),
        scene(3.0, Some(("wipeleft", 500.0))),
    ];
    let inv = encode(
        plan_stitch(
            &[artifact(0), artifact(1), artifact(2)],
            &scenes,
            None,
            &CompositionOptions::default(),
            Path::new("/out/.staging.partial"),
        )
        .unwrap(),
    );
    assert_eq!(inv.label, STITCH_LABEL);
    let g = graph(&inv);
    assert!(g.contains("[s0][s1]xfade=transition=fade:duration=1:offset=2[j1]"));
    assert!(g.contains("[j1][s2]concat=n=2:v=1:a=0[j2]"));
    assert!(g.ends_with("[j2]format=yuv420p[vout]"));
    // The last scene's transition has nothing to blend into.
    assert!(!g.contains("wipeleft"));

    let t = inv.args.iter().position(|a| a == "-t").unwrap();
    assert_eq!(inv.args[t + 1], "9");
    assert!(inv.args.contains(&"-an".to_owned()));
    assert_eq!(inv.args.last().unwrap(), "/out/.staging.partial");
    assert_eq!(inv.output, PathBuf::from("/out/.staging.partial"));
}

#[test]
fn chained_transitions_accumulate_offsets() {
    let scenes = [
        scene(3.0, Some(("fade", 1000.0))),
        scene(4.0, Some(("slideup", 1000.0))),
        scene(4.0, None),
    ];
    let g = graph(&encode(
        plan_stitch(
            &[artifact(0), artifact(1), artifact(2)],
            &scenes,
            None,
            &CompositionOptions::default(),
            Path::new("s.partial"),
        )
        .unwrap(),
    ))
    .to_owned();
    assert!(g.contains("xfade=transition=fade:duration=1:offset=2[j1]"));
    assert!(g.contains("[j1][s2]xfade=transition=slideup:duration=1:offset=5[j2]"));
}

#[test]
fn audio_is_mapped_after_the_video_inputs() {
    let mix = AudioMix {
        path: PathBuf::from("/music.mp3"),
        looped: true,
        volume: 1.0,
        fade_in: 0.0,
        fade_out: 1.0,
        total_secs: 3.0,
    };
    let inv = encode(
        plan_stitch(
            &[artifact(0)],
            &[scene(3.0, None)],
            Some(&mix),
            &CompositionOptions::default(),
            Path::new("s.partial"),
        )
        .unwrap(),
    );
    let joined = inv.args.join(" ");
    assert!(joined.contains("-i /cache/0.mp4 -stream_loop -1 -i /music.mp3"));
    assert!(graph(&inv).contains("[1:a]atrim=0:3"));
    assert!(joined.contains("-map [vout] -map [aout]"));
    assert!(joined.contains("-c:a aac"));
    assert!(!inv.args.contains(&"-an".to_owned()));
}

#[test]
fn mismatched_artifacts_are_rejected() {
    let opts = CompositionOptions::default();
    let staging = Path::new("s.partial");
    assert!(matches!(
        plan_stitch(&[], &[], None, &opts, staging),
        Err(FramecraftError::Config(_))
    ));
    assert!(matches!(
        plan_stitch(
            &[artifact(1), artifact(0)],
            &[scene(1.0, None), scene(1.0, None)],
            None,
            &opts,
            staging
        ),
        Err(FramecraftError::Config(_))
    ));
}
