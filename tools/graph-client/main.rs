use clap::Parser;
use graph_heuristic::prelude::*;
use graph_heuristic::protocol::packet;
use rand::Rng;
use rand::rngs::ThreadRng;
use std::net::TcpStream;

/// Sends randomly generated graph batches to a running heuristic server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server port on 127.0.0.1
    #[arg(short, long, default_value_t = 8246)]
    port: u16,

    /// Number of problem/solution pairs per request
    #[arg(short, long, default_value_t = 4)]
    graphs: usize,

    /// Maximum candidates per solution graph
    #[arg(long, default_value_t = 6)]
    max_next: usize,

    /// Send a train request with random labels instead of an estimate request
    #[arg(short, long)]
    train: bool,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let bounds = GraphBounds::default();
    let mut rng = rand::rng();

    if cli.max_next > bounds.max_candidates() {
        eprintln!(
            "Error: --max-next ({}) cannot exceed {}",
            cli.max_next,
            bounds.max_candidates()
        );
        std::process::exit(1);
    }

    let mut batch = Batch::default();
    for _ in 0..cli.graphs {
        let problem = random_graph(&mut rng, &bounds, 0)?;
        let candidates = rng.random_range(1..=cli.max_next.max(1));
        let solution = random_graph(&mut rng, &bounds, candidates)?;
        batch.push(problem, solution);
    }
    println!("Generated {} graph pairs.", batch.len());

    let socket = TcpStream::connect(("127.0.0.1", cli.port))?;
    let mut stream = PacketStream::new(socket);

    if cli.train {
        packet::write_train_request(&mut stream, &batch);
        stream.flush()?;
        let loss = packet::read_train_response(&mut stream)?;
        println!("Training loss: {}", loss);
    } else {
        packet::write_estimate_request(&mut stream, &batch);
        stream.flush()?;
        let scores = packet::read_estimate_response(&mut stream)?;
        for (i, row) in scores.iter().enumerate() {
            println!("  -> Graph {}: {:?}", i, row);
        }
    }

    Ok(())
}

/// A graph with a random body and `candidates` random labelled candidates.
fn random_graph(
    rng: &mut ThreadRng,
    bounds: &GraphBounds,
    candidates: usize,
) -> std::result::Result<Graph, GraphError> {
    let mut graph = Graph::new(bounds);
    let body = rng.random_range(1..=bounds.max_connections);
    for _ in 0..body {
        graph.add_connection(random_connection(rng, bounds))?;
    }
    for _ in 0..candidates {
        let label = rng.random_range(0.0..1.0);
        graph.add_next(random_connection(rng, bounds).with_heuristic(label))?;
    }
    Ok(graph)
}

fn random_connection(rng: &mut ThreadRng, bounds: &GraphBounds) -> Connection {
    Connection::new(
        rng.random_range(0..bounds.max_nodes as u32),
        rng.random_range(0..bounds.num_node_types as u32),
        rng.random_range(0..bounds.max_plugs as u32),
        rng.random_range(0..bounds.num_data_types as u32),
    )
}
