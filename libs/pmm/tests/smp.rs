use std::{
    collections::HashSet,
    sync::{Barrier, Mutex},
    thread,
};

use archop::hosted::{self, Hosted};
use minfo::{PAddr, PAGE_SIZE};
use pmm::{Error, PageAllocator};
use rand::{rngs::StdRng, Rng, SeedableRng};

const NR_CPUS: usize = 4;

struct Machine {
    _mem: Vec<u8>,
    pmm: PageAllocator<Hosted>,
}

fn machine(nr_frames: usize) -> Machine {
    let mem = vec![0u8; (nr_frames + 1) * PAGE_SIZE];
    let start = mem.as_ptr() as usize;
    let top = minfo::page_round_up(start) + nr_frames * PAGE_SIZE;
    let pmm = unsafe { PageAllocator::new(PAddr::new(start), PAddr::new(top), 0, NR_CPUS) };
    Machine { _mem: mem, pmm }
}

#[test]
fn random_traffic_keeps_frames_unique() {
    hosted::init_logger(log::Level::Debug);
    let m = machine(64);
    let in_use = Mutex::new(HashSet::new());

    let kept = thread::scope(|s| {
        let workers = (0..NR_CPUS)
            .map(|cpu| {
                let (m, in_use) = (&m, &in_use);
                s.spawn(move || {
                    hosted::bind_cpu(cpu);
                    let mut rng = StdRng::seed_from_u64(cpu as u64);
                    let mut mine = Vec::new();

                    for _ in 0..2000 {
                        if mine.is_empty() || rng.random_bool(0.55) {
                            match m.pmm.alloc() {
                                Ok(paddr) => {
                                    assert!(
                                        in_use.lock().unwrap().insert(paddr),
                                        "{:?} handed out twice",
                                        paddr
                                    );
                                    // The page is ours, so scribbling on it must be harmless.
                                    unsafe { *(*paddr as *mut usize) = cpu };
                                    mine.push(paddr);
                                }
                                Err(Error::Exhausted) => {}
                            }
                        } else {
                            let paddr = mine.swap_remove(rng.random_range(0..mine.len()));
                            assert_eq!(unsafe { *(*paddr as *const usize) }, cpu);
                            assert!(in_use.lock().unwrap().remove(&paddr));
                            unsafe { m.pmm.free(paddr) };
                        }
                    }
                    mine.len()
                })
            })
            .collect::<Vec<_>>();

        workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .sum::<usize>()
    });

    assert_eq!(kept, in_use.lock().unwrap().len());
    assert_eq!(m.pmm.free_count(), m.pmm.nr_frames() - kept);

    let stat = m.pmm.stat();
    assert_eq!(stat.current_used(), kept);
    assert_eq!(stat.alloc_cnt() - stat.free_cnt(), kept);
}

#[test]
fn one_cpu_drains_everyone() {
    let m = machine(40);
    let barrier = Barrier::new(NR_CPUS);

    // The other CPUs churn their own lists while CPU 0 allocates until
    // nothing is left anywhere, which it can only do by stealing.
    let taken = thread::scope(|s| {
        let thief = s.spawn(|| {
            hosted::bind_cpu(0);
            barrier.wait();
            let mut taken = Vec::new();
            while let Ok(paddr) = m.pmm.alloc() {
                taken.push(paddr);
            }
            taken
        });
        for cpu in 1..NR_CPUS {
            let barrier = &barrier;
            let m = &m;
            s.spawn(move || {
                hosted::bind_cpu(cpu);
                barrier.wait();
                for _ in 0..3 {
                    if let Ok(paddr) = m.pmm.alloc() {
                        unsafe { m.pmm.free(paddr) };
                    }
                }
            });
        }
        thief.join().unwrap()
    });

    let unique = taken.iter().copied().collect::<HashSet<_>>();
    assert_eq!(unique.len(), taken.len());
    assert!(m.pmm.stat().steal_cnt() > 0);

    // Whatever was in flight when the thief gave up is back on some list.
    assert_eq!(m.pmm.free_count() + taken.len(), m.pmm.nr_frames());
}
