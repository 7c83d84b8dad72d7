use mindgraph_core::GraphNode;

/// Marks which nodes correspond to concepts currently in the study plan.
/// A derived-attribute pass: `in_plan` is recomputed from scratch each time,
/// nothing else is touched.
pub fn annotate_plan_membership<'a>(
    nodes: impl Iterator<Item = &'a mut GraphNode>,
    plan_concepts: &[String],
) {
    for node in nodes {
        node.in_plan =
            !plan_concepts.is_empty() && plan_concepts.iter().any(|c| c == &node.raw_label);
    }
}
