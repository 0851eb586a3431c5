#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};
    use std::num::NonZero;
    use std::thread;
    use std::time::Duration;

    use crate::api::{self, solve, SolveOptions, SolveResponse};
    use crate::board;
    use crate::builder::{Builder, BuilderInvalidReason, CircleSpaceBuilder, FreeformSpaceBuilder, HexSpaceBuilder, SquareSpaceBuilder};
    use crate::compiler::compile;
    use crate::config::SolverConfig;
    use crate::error::{ErrorKind, FlowError};
    use crate::graph::{RoleTag, Role};
    use crate::location::{Dimension, Location};
    use crate::model::{Assignment, ConstraintModel, Violation};
    use crate::pool::SolvePool;
    use crate::shape::SquareStep;
    use crate::solver::clock::Instant;
    use crate::solver::{Backend, CancelToken, Deadline};
    use crate::space::Space;

    fn dims(x: usize, y: usize) -> (Dimension, Dimension) {
        (NonZero::new(x).unwrap(), NonZero::new(y).unwrap())
    }

    fn options(backend: Backend) -> SolveOptions {
        SolveOptions::default()
            .with_backend(backend)
            .with_deadline(Duration::from_secs(60))
    }

    /// Check the response describes a valid path set over its own graph.
    fn assert_valid(response: &SolveResponse, fill: bool) {
        let edges = response.graph.edges.iter()
            .map(|[a, b]| if a <= b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) })
            .collect::<HashSet<_>>();

        let mut covered = HashSet::new();
        for (color, path) in &response.paths {
            let [a, b] = &response.graph.terminals[color];
            let ends = BTreeSet::from([path[0].clone(), path[path.len() - 1].clone()]);
            assert_eq!(ends, BTreeSet::from([a.clone(), b.clone()]), "{color} does not join its terminals");

            for node in path {
                assert!(covered.insert(node.clone()), "{node} is visited twice");
                assert_eq!(response.node_color[node].as_deref(), Some(color.as_str()));
            }

            for pair in path.windows(2) {
                let key = if pair[0] <= pair[1] { (pair[0].clone(), pair[1].clone()) } else { (pair[1].clone(), pair[0].clone()) };
                assert!(edges.contains(&key), "{} -> {} is not an edge", pair[0], pair[1]);
            }
        }

        for (node, color) in &response.node_color {
            assert_eq!(color.is_some(), covered.contains(node), "{node} is colored but on no path");
        }

        if fill {
            assert_eq!(covered.len(), response.graph.nodes.len());
        }
    }

    fn solved(space: &Space, backend: Backend) -> String {
        let response = solve(space, &options(backend)).unwrap();
        assert_valid(&response, space.fill);
        board::render(space, Some(&response)).unwrap()
    }

    fn most_basic() -> Space {
        // flow free classic pack level 1
        SquareSpaceBuilder::with_dims(dims(5, 5))
            .add_termini('A', (Location(0, 0), Location(1, 4)))
            .add_termini('B', (Location(2, 0), Location(1, 3)))
            .add_termini('C', (Location(2, 1), Location(2, 4)))
            .add_termini('D', (Location(4, 0), Location(3, 3)))
            .add_termini('E', (Location(4, 1), Location(3, 4)))
            .build()
            .unwrap()
    }

    /// Both terminals share a checkerboard color, so no covering path exists, and neither backend can prove it quickly.
    fn parity_trap(size: usize) -> Space {
        SquareSpaceBuilder::with_dims(dims(size, size))
            .add_termini('A', (Location(0, 0), Location(2, 0)))
            .build()
            .unwrap()
    }

    fn line() -> Space {
        FreeformSpaceBuilder::new()
            .add_node("n0", [0.0, 0.0, 0.0])
            .add_node("n1", [1.0, 0.0, 0.0])
            .add_node("n2", [2.0, 0.0, 0.0])
            .add_edge("n0", "n1")
            .add_edge("n1", "n2")
            .add_termini('A', ("n0", "n2"))
            .build()
            .unwrap()
    }

    #[test]
    fn remove_termini() {
        let space = SquareSpaceBuilder::with_dims(dims(5, 5))
            .add_termini('A', (Location(0, 0), Location(1, 4)))
            .pop_termini()
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), ".....
.....
.....
.....
.....
");
    }

    #[test]
    fn solve_most_basic() {
        let space = most_basic();

        assert_eq!(board::render(&space, None).unwrap(), "A.B.D
..C.E
.....
.B.D.
.ACE.
");

        for backend in [Backend::Sat, Backend::Search] {
            assert_eq!(solved(&space, backend), "AbBdD
abCdE
abcde
aBcDe
aACEe
");
        }
    }

    #[test]
    fn solve_large_simple_square() {
        // flow free extreme pack 2 12x12 level 13
        let space = SquareSpaceBuilder::with_dims(dims(12, 12))
            .add_termini('A', (Location(7, 4), Location(4, 11)))
            .add_termini('B', (Location(6, 4), Location(5, 11)))
            .add_termini('C', (Location(6, 6), Location(0, 11)))
            .add_termini('D', (Location(2, 2), Location(7, 3)))
            .add_termini('E', (Location(5, 4), Location(7, 11)))
            .add_termini('F', (Location(7, 2), Location(3, 8)))
            .add_termini('G', (Location(2, 8), Location(5, 10)))
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), "............
............
..D....F....
.......D....
.....EBA....
............
......C.....
............
..GF........
............
.....G......
C...AB.E....
");

        assert_eq!(solved(&space, Backend::Sat), "ccccceeeeeee
caaacebbbbbe
caDacebFffbe
cadacebDdfbe
cadacEBAdfbe
cadacccadfbe
cadaaaCadfbe
cadddaaadfbe
caGFdddddfbe
cagfffffffbe
cagggGbbbbbe
CaaaABbEeeee
")
    }

    #[test]
    fn simple_with_bridge() {
        // flow free bridges starter pack 5x5 level 2
        let space = SquareSpaceBuilder::with_dims(dims(5, 5))
            .add_termini('A', (Location(1, 3), Location(3, 0)))
            .add_termini('B', (Location(1, 4), Location(4, 3)))
            .add_termini('C', (Location(0, 0), Location(0, 4)))
            .add_termini('D', (Location(1, 0), Location(2, 2)))
            .add_termini('E', (Location(4, 0), Location(2, 3)))
            .add_bridge(Location(2, 1))
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), "CD.AE
..+..
..D..
.AE.B
CB...
");

        assert_eq!(solved(&space, Backend::Sat), "CDdAE
ca+ae
caDee
cAEeB
CBbbb
");
    }

    #[test]
    fn adjacent_bridges() {
        // flow free bridges hashed pack 7x7 level 1
        let space = SquareSpaceBuilder::with_dims(dims(7, 7))
            .add_termini('A', (Location(0, 5), Location(5, 6)))
            .add_termini('B', (Location(0, 0), Location(6, 6)))
            .add_termini('C', (Location(1, 1), Location(6, 1)))
            .add_termini('D', (Location(1, 2), Location(6, 4)))
            .add_termini('E', (Location(1, 5), Location(6, 2)))
            .add_termini('F', (Location(4, 2), Location(4, 5)))
            .add_bridge(Location(2, 3))
            .add_bridge(Location(2, 4))
            .add_bridge(Location(3, 3))
            .add_bridge(Location(3, 4))
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), "B......
.C....C
.D..F.E
..++...
..++..D
AE..F..
.....AB
");

        assert_eq!(solved(&space, Backend::Sat), "Bcccccc
bCeeeeC
bDefFeE
bd++ddd
bb++bbD
AEefFbb
aaaaaAB
");
    }

    #[test]
    fn simple_with_warp() {
        // flow free warps starter pack level 2
        let space = SquareSpaceBuilder::with_dims(dims(5, 3))
            .add_termini('A', (Location(0, 0), Location(4, 0)))
            .add_termini('B', (Location(3, 1), Location(4, 2)))
            .add_termini('C', (Location(0, 2), Location(2, 1)))
            .add_termini('D', (Location(1, 1), Location(4, 1)))
            .add_warp(Location(0, 1), None)
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), "A...A
.DCBD
C...B
");

        for backend in [Backend::Sat, Backend::Search] {
            assert_eq!(solved(&space, backend), "AaaaA
dDCBD
CccbB
");
        }
    }

    #[test]
    fn warp_with_holes() {
        // flow free warps starter pack level 1
        let space = SquareSpaceBuilder::with_dims(dims(6, 3))
            .add_termini('A', (Location(0, 1), Location(4, 1)))
            .add_termini('B', (Location(1, 0), Location(3, 0)))
            .add_termini('C', (Location(1, 1), Location(3, 1)))
            .add_termini('D', (Location(1, 2), Location(3, 2)))
            .add_warp(Location(0, 1), None)
            .drop_location(Location(0, 0))
            .drop_location(Location(0, 2))
            .drop_location(Location(4, 0))
            .drop_location(Location(5, 0))
            .drop_location(Location(4, 2))
            .drop_location(Location(5, 2))
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), "#B.B##
AC.CA.
#D.D##
");

        assert_eq!(solved(&space, Backend::Sat), "#BbB##
ACcCAa
#DdD##
");
    }

    #[test]
    fn walls() {
        // flow free pockets pack level 1
        let space = SquareSpaceBuilder::with_dims(dims(8, 8))
            .add_termini('A', (Location(1, 2), Location(6, 5)))
            .disconnect_around(Location(1, 2), vec![SquareStep::Left, SquareStep::Down, SquareStep::Right])
            .disconnect_around(Location(6, 5), vec![SquareStep::Left, SquareStep::Down, SquareStep::Right])
            .add_termini('B', (Location(2, 5), Location(4, 5)))
            .disconnect_around(Location(2, 5), vec![SquareStep::Left, SquareStep::Down, SquareStep::Right])
            .add_termini('C', (Location(4, 4), Location(7, 7)))
            .disconnect_around(Location(4, 4), vec![SquareStep::Left, SquareStep::Down, SquareStep::Right])
            .add_termini('D', (Location(5, 2), Location(7, 5)))
            .disconnect_around(Location(5, 2), vec![SquareStep::Left, SquareStep::Down, SquareStep::Right])
            .add_termini('E', (Location(3, 1), Location(3, 7)))
            .disconnect_around(Location(3, 1), vec![SquareStep::Left, SquareStep::Down, SquareStep::Right])
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), "........
...E....
.A...D..
........
....C...
..B.B.AD
........
...E...C
");

        assert_eq!(solved(&space, Backend::Sat), "eeeeaaaa
eaaEadda
eAaaaDda
eccccdda
ecbbCdaa
ecBbBdAD
eccccddd
eeeEcccC
");
    }

    #[test]
    fn warps_and_bridges() {
        // flow free bridges warps pack level 150
        let space = SquareSpaceBuilder::with_dims(dims(9, 9))
            .add_termini('A', (Location(6, 1), Location(7, 2)))
            .add_termini('B', (Location(3, 2), Location(5, 6)))
            .add_termini('C', (Location(3, 4), Location(5, 3)))
            .add_termini('D', (Location(2, 7), Location(6, 3)))
            .add_termini('E', (Location(6, 2), Location(7, 7)))
            .add_termini('F', (Location(2, 6), Location(4, 8)))
            .add_termini('G', (Location(1, 0), Location(0, 3)))
            .add_termini('H', (Location(3, 1), Location(3, 3)))
            .add_termini('I', (Location(0, 8), Location(3, 7)))
            .add_termini('J', (Location(5, 5), Location(5, 8)))
            .add_warp(Location(4, 0), None)
            .add_warp(Location(4, 8), None)
            .add_warp(Location(0, 4), None)
            .add_warp(Location(8, 4), None)
            .add_bridge(Location(4, 6))
            .build()
            .unwrap();

        assert_eq!(board::render(&space, None).unwrap(), ".G.......
...H..A..
...B..EA.
G..H.CD..
...C.....
.....J...
..F.+B...
..DI...E.
I...FJ...
");

        assert_eq!(solved(&space, Backend::Sat), "gGfffeeee
gffHheAae
gfbBheEAe
GfbHhCDee
dfbCccded
dfbbjJded
dfFb+Bded
ddDIjjdEd
IiiiFJddd
");
    }

    #[test]
    fn terminal_pairs_match_declared_colors() {
        let space = most_basic();
        let graph = compile(&space).unwrap();

        assert_eq!(graph.terminal_pairs().count(), 5);
        for (affiliation, (a, b)) in graph.terminal_pairs() {
            let color = graph.color(affiliation).unwrap();
            for node in [a, b] {
                assert_eq!(graph.node(node).role, Role::Terminal(affiliation));
                assert_eq!(graph.node(node).extra["color"], color.0);
            }
        }

        // declaration order follows the builder
        let names = graph.colors().iter().map(|color| color.0.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["A", "B", "C", "D", "E"]);
        assert_eq!(graph.name(graph.terminals_of(1).unwrap().0), "0,0");
    }

    #[test]
    fn bridge_channels_never_adjacent() {
        let space = SquareSpaceBuilder::with_dims(dims(3, 3))
            .add_termini('A', (Location(0, 1), Location(2, 1)))
            .add_termini('B', (Location(1, 0), Location(1, 2)))
            .add_bridge(Location(1, 1))
            .build()
            .unwrap();
        let graph = compile(&space).unwrap();

        let h = graph.find("1,1:h").unwrap();
        let v = graph.find("1,1:v").unwrap();
        assert!(!graph.contains_edge(h, v));
        assert_eq!(graph.node(h).role, Role::BridgeChannel);
        assert_eq!(graph.node(h).position.0, graph.node(v).position.0);
        assert_ne!(graph.node(h).position.2, graph.node(v).position.2);

        let names = |node| graph.neighbors(node).into_iter().map(|n| graph.name(n).to_string()).collect::<Vec<_>>();
        assert_eq!(names(h), ["0,1", "2,1"]);
        assert_eq!(names(v), ["1,0", "1,2"]);
        assert_eq!(graph.tiles(), [vec![h, v]]);

        // the two colors cross on the bridge
        let response = solve(&space, &options(Backend::Search).with_fill(false)).unwrap();
        assert_eq!(response.paths["A"], ["0,1", "1,1:h", "2,1"]);
        assert_eq!(response.paths["B"], ["1,0", "1,1:v", "1,2"]);
    }

    #[test]
    fn graph_is_deterministic() {
        let space = most_basic();
        assert_eq!(api::graph(&space).unwrap(), api::graph(&space).unwrap());

        let graph = api::graph(&line()).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges, [["n0", "n1"], ["n1", "n2"]]);
        assert_eq!(graph.terminals["A"], ["n0", "n2"]);
        assert_eq!(graph.nodes[0].role, RoleTag::Terminal);
        assert_eq!(graph.nodes[1].role, RoleTag::Plain);
    }

    #[test]
    fn corner_pairs_cannot_cross() {
        // A...B / ..... / ..... / ..... / B...A: any A path splits the board with B's terminals on either side
        let space = SquareSpaceBuilder::with_dims(dims(5, 5))
            .add_termini('A', (Location(0, 0), Location(4, 4)))
            .add_termini('B', (Location(4, 0), Location(0, 4)))
            .build()
            .unwrap();

        for backend in [Backend::Sat, Backend::Search] {
            assert!(matches!(solve(&space, &options(backend)), Err(FlowError::NoSolution)));
        }
    }

    #[test]
    fn two_colors_fill_five_by_five() {
        let space = SquareSpaceBuilder::with_dims(dims(5, 5))
            .add_termini('A', (Location(0, 0), Location(4, 0)))
            .add_termini('B', (Location(0, 1), Location(4, 4)))
            .build()
            .unwrap();

        for backend in [Backend::Sat, Backend::Search] {
            let response = solve(&space, &options(backend)).unwrap();
            assert_valid(&response, true);
            assert_eq!(response.paths.values().map(Vec::len).sum::<usize>(), 25);
        }
    }

    #[test]
    fn line_graph() {
        for backend in [Backend::Sat, Backend::Search] {
            let response = solve(&line(), &options(backend)).unwrap();
            assert_eq!(response.paths["A"], ["n0", "n1", "n2"]);
        }
    }

    #[test]
    fn unreachable_terminals() {
        let space = SquareSpaceBuilder::with_dims(dims(3, 3))
            .add_termini('A', (Location(0, 0), Location(2, 0)))
            .add_termini('B', (Location(0, 2), Location(2, 2)))
            .drop_location(Location(1, 0))
            .drop_location(Location(1, 1))
            .drop_location(Location(1, 2))
            .build()
            .unwrap();

        for backend in [Backend::Sat, Backend::Search] {
            for fill in [true, false] {
                let err = solve(&space, &options(backend).with_fill(fill)).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::NoSolution);
            }
        }
    }

    #[test]
    fn tiny_deadline_times_out() {
        let options = options(Backend::Search).with_deadline(Duration::from_millis(1));
        assert!(matches!(solve(&parity_trap(12), &options), Err(FlowError::TimedOut(_))));

        let options = options.with_backend(Backend::Sat);
        let result = api::solve_json(&parity_trap(30).to_json().unwrap(), &serde_json::to_string(&options).unwrap());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn sat_worker_stops_at_deadline() {
        // solve joins its solver thread before returning, so returning promptly means the thread has stopped
        let started = Instant::now();
        let options = options(Backend::Sat).with_deadline(Duration::from_millis(200));
        assert!(matches!(solve(&parity_trap(30), &options), Err(FlowError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn deadline_clock() {
        let started = Instant::now();
        thread::sleep(Duration::from_millis(5));
        assert!(started.elapsed() >= Duration::from_millis(5));
        assert!(Instant::now().saturating_duration_since(started) >= Duration::from_millis(5));
        assert_eq!(started.saturating_duration_since(Instant::now()), Duration::ZERO);

        let deadline = Deadline::after(Duration::from_millis(10), CancelToken::new());
        thread::sleep(Duration::from_millis(20));
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);

        let cancel = CancelToken::new();
        let deadline = Deadline::after(Duration::from_secs(60), cancel.clone());
        assert!(!deadline.expired());
        assert!(deadline.remaining() > Duration::from_secs(50));
        cancel.cancel();
        assert!(deadline.expired());
        assert!(deadline.cancel_token().is_cancelled());
    }

    #[cfg(target_arch = "wasm32")]
    #[wasm_bindgen_test::wasm_bindgen_test]
    fn deadline_bounded_solve_on_wasm() {
        for backend in [Backend::Sat, Backend::Search] {
            let options = options(backend).with_deadline(Duration::from_millis(1));
            assert!(matches!(solve(&parity_trap(12), &options), Err(FlowError::TimedOut(_))));
        }
        assert_eq!(solve(&line(), &options(Backend::Sat)).unwrap().paths["A"], ["n0", "n1", "n2"]);
    }

    #[test]
    fn long_paths_fit_a_small_stack() {
        const LENGTH: usize = 5_000;
        let mut builder = FreeformSpaceBuilder::new();
        for i in 0..LENGTH {
            builder.add_node(&format!("n{i}"), [i as f64, 0.0, 0.0]);
        }
        for i in 1..LENGTH {
            builder.add_edge(&format!("n{}", i - 1), &format!("n{i}"));
        }
        let space = builder.add_termini('A', ("n0", &format!("n{}", LENGTH - 1))).build().unwrap();

        let graph = compile(&space).unwrap();
        assert_eq!(graph.find("n4321").map(|node| node.index()), Some(4321));
        assert_eq!(graph.name(graph.find("n0").unwrap()), "n0");
        assert_eq!(graph.find("n5000"), None);

        let solver = thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || solve(&space, &options(Backend::Search)))
            .unwrap();
        let response = solver.join().unwrap().unwrap();
        assert_eq!(response.paths["A"].len(), LENGTH);
        assert_eq!(response.paths["A"][LENGTH - 1], format!("n{}", LENGTH - 1));
    }

    #[test]
    fn fill_is_stricter() {
        let space = SquareSpaceBuilder::with_dims(dims(3, 3))
            .add_termini('A', (Location(0, 0), Location(2, 0)))
            .with_fill(false)
            .build()
            .unwrap();

        let response = solve(&space, &options(Backend::Search)).unwrap();
        assert_eq!(response.paths["A"], ["0,0", "1,0", "2,0"]);
        assert_eq!(response.node_color["1,1"], None);
        assert_eq!(board::render(&space, Some(&response)).unwrap(), "AaA
...
...
");

        for backend in [Backend::Sat, Backend::Search] {
            let response = solve(&space, &options(backend).with_fill(false)).unwrap();
            assert_valid(&response, false);

            let response = solve(&space, &options(backend).with_fill(true)).unwrap();
            assert_valid(&response, true);
            assert_eq!(response.paths["A"].len(), 9);
        }

        // adjacent terminals on a 3x3 board have a path, but no path can cover all nine cells
        let space = SquareSpaceBuilder::with_dims(dims(3, 3))
            .add_termini('A', (Location(0, 0), Location(1, 0)))
            .build()
            .unwrap();

        for backend in [Backend::Sat, Backend::Search] {
            assert!(matches!(solve(&space, &options(backend)), Err(FlowError::NoSolution)));
            let response = solve(&space, &options(backend).with_fill(false)).unwrap();
            assert_eq!(response.paths["A"], ["0,0", "1,0"]);
        }
    }

    #[test]
    fn hex_neighbors() {
        let space = HexSpaceBuilder::with_dims(dims(3, 3))
            .add_termini('A', (Location(0, 0), Location(2, 2)))
            .build()
            .unwrap();
        let graph = compile(&space).unwrap();

        let names = |name: &str| {
            let node = graph.find(name).unwrap();
            graph.neighbors(node).into_iter().map(|n| graph.name(n).to_string()).collect::<BTreeSet<_>>()
        };
        assert_eq!(names("1,1"), BTreeSet::from(["0,1", "2,1", "1,0", "2,0", "1,2", "2,2"].map(String::from)));
        assert_eq!(names("1,0"), BTreeSet::from(["0,0", "2,0", "0,1", "1,1"].map(String::from)));

        assert_eq!(board::render(&space, None).unwrap(), "A . .
 . . .
. . A
");

        for backend in [Backend::Sat, Backend::Search] {
            let response = solve(&space, &options(backend)).unwrap();
            assert_valid(&response, true);
        }
    }

    #[test]
    fn circle_with_core() {
        let space = CircleSpaceBuilder::with_dims(dims(4, 2))
            .with_core(true)
            .add_termini('A', (Location(0, 0), Location(2, 0)))
            .build()
            .unwrap();
        let graph = compile(&space).unwrap();

        assert_eq!(graph.node_count(), 9);
        assert_eq!(graph.edge_count(), 16);
        let core = graph.find("core").unwrap();
        assert_eq!(graph.degree(core), 4);
        assert_eq!(graph.node(core).position, (0.0, 0.0, 0.0));
        assert_eq!(graph.degree(graph.find("0,0").unwrap()), 4);
        assert_eq!(graph.degree(graph.find("3,1").unwrap()), 3);
        assert!(graph.contains_edge(graph.find("3,0").unwrap(), graph.find("0,0").unwrap()));

        for backend in [Backend::Sat, Backend::Search] {
            let response = solve(&space, &options(backend)).unwrap();
            assert_valid(&response, true);
            assert_eq!(response.paths["A"].len(), 9);
        }
    }

    #[test]
    fn invalid_spaces() {
        let kind = |json: &str| Space::from_json(json)
            .and_then(|space| compile(&space).map(|_| ()))
            .map_err(|err| err.kind());

        assert_eq!(kind(r#"{"kind":"square","width":3,"height":1,"cells":[[{"terminal":"A"},"empty","empty"]]}"#),
                   Err(ErrorKind::ValidationError));
        assert_eq!(kind(r#"{"kind":"square","width":2,"height":1,"cells":[["empty","empty"]]}"#),
                   Err(ErrorKind::ValidationError));
        assert_eq!(kind(r#"{"kind":"square","width":0,"height":0,"cells":[]}"#),
                   Err(ErrorKind::ConfigError));
        assert_eq!(kind(r#"{"kind":"square","width":3,"height":1,"cells":[["empty"]]}"#),
                   Err(ErrorKind::ConfigError));
        assert_eq!(kind(r#"{"kind":"hex","width":3,"height":2,"cells":[["bridge","empty","empty"],[{"terminal":"A"},"empty",{"terminal":"A"}]]}"#),
                   Err(ErrorKind::ConfigError));
        assert_eq!(kind(r#"{"kind":"freeform","nodes":[{"id":"a"},{"id":"b"}],"edges":[["a","c"]],"terminals":[["A",["a","b"]]]}"#),
                   Err(ErrorKind::ValidationError));
        assert_eq!(kind(r#"{"kind":"freeform","nodes":[{"id":"a"},{"id":"b"},{"id":"c"}],"edges":[["a","b"]],"terminals":[["A",["a","c"]]]}"#),
                   Err(ErrorKind::ValidationError));
        assert_eq!(kind(r#"{"kind":"triangle","width":3,"height":3}"#), Err(ErrorKind::ConfigError));
        assert_eq!(kind(r#"{"kind":"square","width":3,"height":1,"cells":[[{"terminal":"A"},"empty",{"terminal":"A"},"hole"]]}"#), Err(ErrorKind::ConfigError));
        assert_eq!(kind(r#"{"kind":"square","width":4,"height":1,"cells":[[{"terminal":"A"},"empty",{"terminal":"A"},"hole"]]}"#), Ok(()));
    }

    #[test]
    fn warps_join_opposite_borders() {
        let compiled = |warps: &str| compile(&Space::from_json(&format!(
            r#"{{"kind":"square","width":3,"height":3,"cells":[[{{"terminal":"A"}},"empty",{{"terminal":"A"}}],["empty","empty","empty"],["empty","empty","empty"]],"warps":{warps}}}"#
        )).unwrap());

        for warps in [r#"[{"from":[1,1],"to":[1,2]}]"#, r#"[{"from":[0,1],"to":[1,1]}]"#, r#"[{"from":[1,0],"to":[1,1]}]"#] {
            assert_eq!(compiled(warps).unwrap_err().kind(), ErrorKind::ConfigError, "{warps}");
        }

        let graph = compiled(r#"[{"from":[0,1],"to":[2,1]},{"from":[1,2],"to":[1,0]}]"#).unwrap();
        let edge = |a: &str, b: &str| graph.contains_edge(graph.find(a).unwrap(), graph.find(b).unwrap());
        assert!(edge("0,1", "2,1"));
        assert!(edge("1,0", "1,2"));
        assert!(!edge("0,0", "2,0"));
    }

    #[test]
    fn invalid_deadlines() {
        for deadline in [Duration::ZERO, Duration::from_micros(500), Duration::from_millis(1_000_001)] {
            let err = solve(&line(), &SolveOptions::default().with_deadline(deadline)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigError);
        }
    }

    #[test]
    fn builder_invalid_reasons() {
        let mut hex = HexSpaceBuilder::with_dims(dims(3, 3));
        hex.add_bridge(Location(1, 1));
        assert_eq!(hex.is_valid(), Some(&vec![BuilderInvalidReason::BridgeUnsupported]));

        let mut square = SquareSpaceBuilder::with_dims(dims(3, 3));
        square.add_bridge(Location(0, 1));
        assert_eq!(square.build().unwrap_err(), &vec![BuilderInvalidReason::BridgeOnBorder]);

        let mut square = SquareSpaceBuilder::with_dims(dims(3, 3));
        square.add_termini('A', (Location(0, 0), Location(3, 0)));
        assert_eq!(square.is_valid(), Some(&vec![BuilderInvalidReason::FeatureOutOfBounds]));

        let mut square = SquareSpaceBuilder::with_dims(dims(3, 3));
        square.add_warp(Location(1, 1), None);
        assert_eq!(square.is_valid(), Some(&vec![BuilderInvalidReason::WarpBadDirection]));

        let mut square = SquareSpaceBuilder::with_dims(dims(3, 3));
        square.add_warp(Location(0, 0), None);
        assert_eq!(square.is_valid(), Some(&vec![BuilderInvalidReason::WarpBadDirection]));

        let mut freeform = FreeformSpaceBuilder::new();
        freeform.add_node("a", [0.0; 3]).add_node("a", [1.0; 3]);
        assert_eq!(freeform.is_valid(), Some(&vec![BuilderInvalidReason::DuplicateNode]));

        let mut freeform = FreeformSpaceBuilder::new();
        freeform.add_node("a", [0.0; 3]).add_edge("a", "b");
        assert_eq!(freeform.is_valid(), Some(&vec![BuilderInvalidReason::UnknownNode]));
    }

    #[test]
    fn json_round_trips() {
        let space = SquareSpaceBuilder::with_dims(dims(5, 3))
            .add_termini('A', (Location(0, 0), Location(4, 0)))
            .add_warp(Location(0, 1), None)
            .disconnect_around(Location(2, 2), vec![SquareStep::Up])
            .add_bridge(Location(2, 1))
            .build()
            .unwrap();
        let text = space.to_json().unwrap();
        assert_eq!(Space::from_json(&text).unwrap(), space);

        let space = Space::from_json(r#"{"kind":"square","width":3,"height":1,"cells":[[{"terminal":"red"},"empty",{"terminal":"red"}]]}"#).unwrap();
        assert!(space.fill);

        let response = solve(&space, &options(Backend::Sat)).unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["nodeColor"]["1,0"], "red");
        assert_eq!(value["paths"]["red"], serde_json::json!(["0,0", "1,0", "2,0"]));
        assert_eq!(value["graph"]["terminals"]["red"], serde_json::json!(["0,0", "2,0"]));
        assert_eq!(value["graph"]["nodes"][0]["role"], "terminal");

        let options: SolveOptions = serde_json::from_str(r#"{"backend":"dfs","fillRequired":false,"deadlineMs":500}"#).unwrap();
        assert_eq!(options.backend, Backend::Search);
        assert_eq!(options.fill_required, Some(false));
        assert_eq!(options.deadline, Duration::from_millis(500));

        let failure = serde_json::to_value(FlowError::NoSolution.payload()).unwrap();
        assert_eq!(failure["kind"], "NoSolution");

        let solved = api::solve_json(&space.to_json().unwrap(), r#"{"backend":"search"}"#).unwrap();
        assert_eq!(serde_json::from_str::<SolveResponse>(&solved).unwrap(), response);
    }

    #[test]
    fn backend_names() {
        assert_eq!("smt".parse::<Backend>().unwrap(), Backend::Sat);
        assert_eq!("dfs".parse::<Backend>().unwrap(), Backend::Search);
        assert_eq!(Backend::Search.to_string(), "search");
        assert!("annealing".parse::<Backend>().is_err());
    }

    #[test]
    fn detached_cycles_are_violations() {
        let space = FreeformSpaceBuilder::new()
            .add_node("a", [0.0; 3])
            .add_node("b", [1.0; 3])
            .add_node("c", [2.0; 3])
            .add_node("d", [3.0; 3])
            .add_node("e", [4.0; 3])
            .add_edge("a", "b")
            .add_edge("c", "d")
            .add_edge("d", "e")
            .add_edge("e", "c")
            .add_termini('A', ("a", "b"))
            .with_fill(false)
            .build()
            .unwrap();
        let graph = compile(&space).unwrap();
        let model = ConstraintModel::build(&graph, false);

        let looped = Assignment { node_colors: vec![1; 5], edge_colors: vec![1; 4] };
        match model.verify(&looped) {
            Err(Violation::DetachedCycles { affiliation, cycles }) => {
                assert_eq!(affiliation, 1);
                assert_eq!(cycles.len(), 1);
                assert_eq!(cycles[0].len(), 3);
            }
            other => panic!("expected a detached cycle, got {other:?}"),
        }

        let uncolored = Assignment { node_colors: vec![0; 5], edge_colors: vec![0; 4] };
        assert!(matches!(model.verify(&uncolored), Err(Violation::TerminalColor { .. })));

        let response = solve(&space, &options(Backend::Sat)).unwrap();
        assert_eq!(response.paths["A"], ["a", "b"]);
        assert_eq!(response.node_color["c"], None);
    }

    #[test]
    fn freeform_tiles_are_distinct_channels() {
        // s-x-y-t or s-t; x and y share one tile, so no color may pass through both
        let space = FreeformSpaceBuilder::new()
            .add_node("s", [0.0; 3])
            .add_node("t", [1.0; 3])
            .add_node("x", [0.5; 3])
            .add_node("y", [0.5; 3])
            .add_edge("s", "x")
            .add_edge("x", "y")
            .add_edge("y", "t")
            .add_edge("s", "t")
            .add_tile(&["x", "y"])
            .add_termini('A', ("s", "t"))
            .with_fill(false)
            .build()
            .unwrap();

        for backend in [Backend::Sat, Backend::Search] {
            let response = solve(&space, &options(backend)).unwrap();
            assert_eq!(response.paths["A"], ["s", "t"]);
            assert!(matches!(solve(&space, &options(backend).with_fill(true)), Err(FlowError::NoSolution)));
        }
    }

    #[test]
    fn pool_runs_and_cancels() {
        let pool = SolvePool::new(SolverConfig { workers: 2, ..Default::default() }).unwrap();
        assert_eq!(pool.workers(), 2);

        let tickets = [most_basic(), line()].map(|space| pool.submit(space, options(Backend::Sat)));
        for ticket in tickets {
            assert_valid(&ticket.wait().unwrap(), true);
        }

        let ticket = pool.submit(parity_trap(12), options(Backend::Search));
        ticket.cancel();
        assert!(matches!(ticket.wait(), Err(FlowError::TimedOut(_))));

        let ticket = pool.submit(parity_trap(30), options(Backend::Sat));
        thread::sleep(Duration::from_millis(50));
        assert!(ticket.try_result().is_none());
        let cancelled = Instant::now();
        ticket.cancel();
        assert!(matches!(ticket.wait(), Err(FlowError::TimedOut(_))));
        assert!(cancelled.elapsed() < Duration::from_secs(20));

        let ticket = pool.submit(line(), options(Backend::Sat).with_deadline(Duration::from_secs(2_000)));
        assert_eq!(ticket.wait().unwrap_err().kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn config_validation() {
        assert!(SolverConfig::default().validate().is_ok());

        let config = SolverConfig { default_deadline_ms: 2_000_000, ..Default::default() };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::ConfigError);

        let config = SolverConfig { check_interval: 0, ..Default::default() };
        assert!(config.validate().is_err());

        std::env::set_var("FLOWCOVER_CHECK_INTERVAL", "64");
        std::env::set_var("FLOWCOVER_BACKEND", "search");
        let config = SolverConfig::from_env().unwrap();
        std::env::remove_var("FLOWCOVER_CHECK_INTERVAL");
        std::env::remove_var("FLOWCOVER_BACKEND");

        assert_eq!(config.check_interval, 64);
        assert_eq!(config.default_backend, Backend::Search);
        assert_eq!(SolveOptions::from_config(&config).backend, Backend::Search);
    }

    #[test]
    fn freeform_cannot_render() {
        assert_eq!(board::render(&line(), None).unwrap_err().kind(), ErrorKind::ConfigError);
    }
}
