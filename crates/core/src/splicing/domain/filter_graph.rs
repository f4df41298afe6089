use crate::splicing::domain::splice_options::SpliceOptions;
use crate::splicing::domain::splice_plan::SplicePlan;

/// Label of the composited video stream in the graph.
pub const OUTPUT_LABEL: &str = "[vout]";

/// Builds the `-filter_complex` graph joining input 0 (A) and input 1 (B).
///
/// Both inputs are normalised to the same rate, pixel format, sample aspect
/// and timebase, which the crossfade requires. When `size` is known, B is
/// scaled to A's frame size.
pub fn build_filter_graph(
    plan: &SplicePlan,
    options: &SpliceOptions,
    size: Option<(u32, u32)>,
) -> String {
    let normalise = format!("fps={},format=yuv420p,setsar=1,settb=AVTB", options.fps);
    let scale_b = size
        .map(|(w, h)| format!("scale={w}:{h},"))
        .unwrap_or_default();

    let join = if plan.is_hard_cut() {
        "concat=n=2:v=1:a=0".to_string()
    } else {
        format!(
            "xfade=transition={}:duration={:.6}:offset={:.6}",
            options.transition_type.xfade_name(),
            plan.transition_secs,
            plan.offset_secs
        )
    };

    format!(
        "[0:v]{normalise}[va];[1:v]{scale_b}{normalise}[vb];[va][vb]{join},format=yuv420p{OUTPUT_LABEL}"
    )
}
