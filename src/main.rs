use std::sync::Arc;

use silt::buffer::BufferPoolManager;
use silt::common::{IndexKey, PageId, Rid, SlotId};
use silt::index::{BPlusTree, IntegerComparator};
use silt::storage::disk::DiskManager;

fn main() {
    println!("Silt - buffer pool + B+ tree storage kernel");
    println!("===========================================\n");

    let db_path = "demo.db";

    let disk_manager = Arc::new(DiskManager::new(db_path).expect("Failed to create disk manager"));
    println!("Opened database file: {}", db_path);

    let bpm = Arc::new(BufferPoolManager::new(16, disk_manager));
    println!("Created buffer pool with 16 frames\n");

    // Small fan-outs so a handful of keys already builds a real tree
    let mut tree = BPlusTree::new("demo_index", Arc::clone(&bpm), IntegerComparator, 4, 4);

    let keys = [13u64, 7, 42, 1, 99, 25, 60, 3, 88, 50, 17, 72];
    for &k in &keys {
        let key = IndexKey::from_u64(k);
        let rid = Rid::new(PageId::new(k as u32), SlotId::new(0));
        tree.insert(key, rid).expect("insert failed");
    }
    println!("Inserted {} keys: {:?}\n", keys.len(), keys);

    let mut dump = Vec::new();
    tree.print_tree(&mut dump).expect("dump failed");
    println!("{}", String::from_utf8_lossy(&dump));

    print!("Forward scan:");
    for item in tree.begin().expect("begin failed") {
        let (key, _rid) = item.expect("scan failed");
        print!(" {}", key);
    }
    println!("\n");

    for k in [7u64, 42, 88] {
        tree.remove(&IndexKey::from_u64(k)).expect("remove failed");
    }
    println!("Removed keys 7, 42, 88\n");

    let mut dump = Vec::new();
    tree.print_tree(&mut dump).expect("dump failed");
    println!("{}", String::from_utf8_lossy(&dump));

    let probe = IndexKey::from_u64(25);
    println!("Lookup 25 -> {:?}", tree.get_value(&probe).expect("lookup failed"));
    let gone = IndexKey::from_u64(42);
    println!("Lookup 42 -> {:?}", tree.get_value(&gone).expect("lookup failed"));

    bpm.flush_all_pages().expect("flush failed");
    println!(
        "\nFlushed all pages ({} disk reads, {} disk writes)",
        bpm.disk_manager().num_reads(),
        bpm.disk_manager().num_writes()
    );

    std::fs::remove_file(db_path).ok();
    println!("Demo completed successfully!");
}
