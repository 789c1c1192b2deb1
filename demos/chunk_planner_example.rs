//! Example demonstrating chunk plan computation
//!
//! This example shows how a requested byte range becomes an aligned
//! fetch plan: which chunk size the request length buys, where the
//! first fetch lands on the chunk grid, and how much of the edge
//! chunks gets trimmed away.

use range_relay::chunk_planner::{bucketed_chunk_size, plan};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

fn main() {
    println!("=== Range Relay Chunk Planner Example ===\n");

    // Example 1: chunk size buckets across request lengths
    println!("1. Chunk size by request length:");
    let lengths = [
        ("4 KiB", 4 * KIB),
        ("100 KiB", 100 * KIB),
        ("1 MiB", MIB),
        ("8 MiB", 8 * MIB),
        ("32 MiB", 32 * MIB),
        ("200 MiB", 200 * MIB),
    ];
    for (label, length) in lengths {
        println!(
            "   {:>8} request -> {:>5} KiB chunks",
            label,
            bucketed_chunk_size(length) / KIB
        );
    }
    println!();

    // Example 2: a mid-object range spanning two chunks
    println!("2. Plan for bytes 1000000-1999999 of a 3000000-byte object:");
    let mid = plan(3_000_000, 1_000_000, 1_999_999, false).unwrap();
    println!("   Chunk size: {} bytes", mid.chunk_size);
    println!("   Aligned offset: {}", mid.aligned_offset);
    println!("   First chunk drops: {} bytes", mid.first_part_cut);
    println!("   Last chunk keeps: {} bytes", mid.last_part_cut);
    println!("   Parts to fetch: {}", mid.part_count);
    println!();

    // Example 3: a range small enough to land in one chunk
    println!("3. Plan for bytes 3500-7999 of a 10000-byte object:");
    let single = plan(10_000, 3_500, 7_999, false).unwrap();
    println!("   Chunk size: {} bytes", single.chunk_size);
    println!("   Parts to fetch: {}", single.part_count);
    println!(
        "   The one chunk is sliced [{}..{}] before it goes out",
        single.first_part_cut, single.last_part_cut
    );
    println!();

    // Example 4: the video cap trades throughput for steady playback
    println!("4. Video objects cap the chunk size at 1 MiB:");
    let film = plan(200 * MIB, 0, 100 * MIB - 1, true).unwrap();
    let blob = plan(200 * MIB, 0, 100 * MIB - 1, false).unwrap();
    println!(
        "   100 MiB of video: {} KiB chunks in {} parts",
        film.chunk_size / KIB,
        film.part_count
    );
    println!(
        "   100 MiB binary:   {} KiB chunks in {} parts",
        blob.chunk_size / KIB,
        blob.part_count
    );
    println!();

    // Example 5: ranges the planner refuses
    println!("5. Range validation:");
    match plan(100, 50, 10, false) {
        Ok(_) => println!("   ✗ Inverted range should have been rejected"),
        Err(e) => println!("   ✓ Inverted range rejected: {}", e),
    }
    match plan(100, 0, 100, false) {
        Ok(_) => println!("   ✗ Range past EOF should have been rejected"),
        Err(e) => println!("   ✓ Range past EOF rejected: {}", e),
    }
    match plan(0, 0, 0, false) {
        Ok(_) => println!("   ✗ Empty object should have been rejected"),
        Err(e) => println!("   ✓ Empty object rejected: {}", e),
    }

    println!("\n=== Example completed ===");
}
