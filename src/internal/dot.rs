//! The `dot` module contains the conversion from a node graph to the graphviz dot format.
//! The functions in this module are used for testing and debugging purposes.

use std::io::Write;

use dot_writer::{Attributes, DotWriter, RankDirection};

use crate::{Graph, NodeID};

fn dot_id(id: NodeID) -> String {
    format!("node_{}", id.as_usize())
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render the given nodes of the graph to a graphviz dot format.
/// Edges to nodes outside of `nodes` are omitted.
pub(crate) fn graph_render<W: Write>(
    graph: &Graph,
    nodes: &[NodeID],
    start: Option<NodeID>,
    label: &str,
    output: &mut W,
) {
    let mut writer = DotWriter::from(output);
    writer.set_pretty_print(true);
    let mut digraph = writer.digraph();
    digraph
        .set_label(label)
        .set_rank_direction(RankDirection::LeftRight);
    for id in nodes {
        let node = &graph[*id];
        let mut text = if node.is_epsilon() {
            id.to_string()
        } else {
            format!("{}: {}", id, node.guard())
        };
        if !node.members().is_empty() {
            let members = node
                .members()
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>();
            text.push_str(&format!(" ({})", members.join(", ")));
        }
        for callback in node.on_enter() {
            text.push_str(&format!(" +{}", callback.name()));
        }
        for callback in node.on_exit() {
            text.push_str(&format!(" -{}", callback.name()));
        }
        let mut dot_node = digraph.node_named(dot_id(*id));
        dot_node.set_label(&escape(&text));
        if Some(*id) == start {
            dot_node
                .set_shape(dot_writer::Shape::Circle)
                .set_color(dot_writer::Color::Blue)
                .set_pen_width(3.0);
        }
        if node.is_terminal() {
            dot_node
                .set_color(dot_writer::Color::Red)
                .set_pen_width(3.0);
        }
    }
    for id in nodes {
        for target in graph[*id].next() {
            if !nodes.contains(target) {
                continue;
            }
            let label = if graph[*target].is_epsilon() {
                "ε".to_string()
            } else {
                escape(&graph[*target].guard().to_string())
            };
            digraph
                .edge(&dot_id(*id), &dot_id(*target))
                .attributes()
                .set_label(&label);
        }
    }
}
