//! Read from several pipes with one thread using `select`.
//!
//! Run with:
//!   cargo run --example fan-in

use std::thread;

use duplexrpc::channel::{select, MessageChannel, Pipe, Selectable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut pipes = Vec::new();
    let mut producers = Vec::new();

    for id in 0..3 {
        let mut near = Pipe::new()?;
        let mut far = near.try_clone()?;
        near.claim_left()?;
        pipes.push(near);

        producers.push(thread::spawn(move || -> duplexrpc::channel::Result<()> {
            far.claim_right()?;
            for n in 0..5 {
                far.write(&format!("producer {id}: message {n}"))?;
            }
            far.close();
            Ok(())
        }));
    }

    while !pipes.is_empty() {
        let ready = {
            let handles: Vec<&dyn Selectable> =
                pipes.iter().map(|pipe| pipe as &dyn Selectable).collect();
            select(&handles, None)?
        };

        let mut finished = Vec::new();
        for idx in ready {
            match pipes[idx].read::<String>()? {
                Some(msg) => println!("{msg}"),
                None => finished.push(idx),
            }
        }
        for idx in finished.into_iter().rev() {
            pipes.remove(idx);
        }
    }

    for producer in producers {
        producer.join().map_err(|_| "producer panicked")??;
    }
    Ok(())
}
