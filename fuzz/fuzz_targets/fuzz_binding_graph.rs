#![no_main]

use arbitrary::Arbitrary;
use ftui_props::{IntegerProperty, bind_bidirectional, unbind_bidirectional};
use libfuzzer_sys::fuzz_target;

const NODES: usize = 5;

#[derive(Debug, Arbitrary)]
enum Op {
    Set { node: u8, value: i32 },
    Bind { target: u8, source: u8 },
    Unbind { node: u8 },
    BindBidirectional { a: u8, b: u8 },
    UnbindBidirectional { a: u8, b: u8 },
}

fuzz_target!(|ops: Vec<Op>| {
    let nodes: Vec<IntegerProperty> = (0..NODES)
        .map(|i| IntegerProperty::new(i as i32).with_name(format!("n{i}")))
        .collect();
    let pick = |n: u8| &nodes[n as usize % NODES];

    // Unidirectional edges as last requested, used while no bidirectional
    // link exists.
    let mut sources: [Option<usize>; NODES] = [None; NODES];
    let mut linked = false;

    for op in ops.iter().take(256) {
        match *op {
            Op::Set { node, value } => {
                let _ = pick(node).set(value);
            }
            Op::Bind { target, source } => {
                if pick(target).bind(pick(source)).is_ok() {
                    sources[target as usize % NODES] = Some(source as usize % NODES);
                }
            }
            Op::Unbind { node } => {
                pick(node).unbind();
                sources[node as usize % NODES] = None;
            }
            Op::BindBidirectional { a, b } => {
                linked |= bind_bidirectional(pick(a), pick(b)).is_ok();
            }
            Op::UnbindBidirectional { a, b } => {
                let _ = unbind_bidirectional(pick(a), pick(b));
            }
        }

        for node in &nodes {
            let _ = node.to_string();
        }
        if !linked {
            for (target, source) in sources.iter().enumerate() {
                if let Some(source) = source {
                    assert_eq!(nodes[target].get(), nodes[*source].get());
                }
            }
        }
    }
});
