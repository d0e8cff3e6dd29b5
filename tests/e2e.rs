//! End-to-end tests: compile a literal C program, run it against the
//! instruction-level simulator in [`sim`], and check the sequence of values
//! passed to `out()`.

mod sim;

#[test]
fn literal_escapes_and_char_combination() {
    let src = "
        int main() {
            out(('\\0') == 0);
            out('abc' == 99);
            out('\\u00c4' == 0xc4);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![1, 1, 1]);
}

#[test]
fn recursive_factorial() {
    let src = r"
        int recFact(int n) {
            if (n == 0) return 1;
            return n * recFact(n - 1);
        }
        int main() {
            out(recFact(5));
            out(recFact(0));
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![120, 1]);
}

#[test]
fn sieve_of_eratosthenes() {
    let src = r"
        int main() {
            int n = in();
            int is_composite[64];
            int i;
            for (i = 0; i <= n; i = i + 1) {
                is_composite[i] = 0;
            }
            for (i = 2; i * i <= n; i = i + 1) {
                int j;
                if (is_composite[i]) continue;
                for (j = i * i; j <= n; j = j + i) {
                    is_composite[j] = 1;
                }
            }
            for (i = 2; i <= n; i = i + 1) {
                if (!is_composite[i]) out(i);
            }
        }
    ";
    let (out, _) = sim::run(src, &[10]);
    assert_eq!(out, vec![2, 3, 5, 7]);
}

#[test]
fn quicksort() {
    let src = r"
        void swap(int *a, int *b) {
            int t = *a;
            *a = *b;
            *b = t;
        }
        int partition(int *a, int lo, int hi) {
            int pivot = a[hi];
            int i = lo - 1;
            int j;
            for (j = lo; j < hi; j = j + 1) {
                if (a[j] <= pivot) {
                    i = i + 1;
                    swap(&a[i], &a[j]);
                }
            }
            swap(&a[i + 1], &a[hi]);
            return i + 1;
        }
        void quicksort(int *a, int lo, int hi) {
            if (lo < hi) {
                int p = partition(a, lo, hi);
                quicksort(a, lo, p - 1);
                quicksort(a, p + 1, hi);
            }
        }
        int main() {
            int a[10];
            int i;
            a[0] = 4; a[1] = 65; a[2] = 123; a[3] = 26; a[4] = -4322;
            a[5] = 123; a[6] = 6786; a[7] = 5656; a[8] = -7745464; a[9] = 34;
            quicksort(a, 0, 9);
            for (i = 0; i < 10; i = i + 1) {
                out(a[i]);
            }
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![-7745464, -4322, 4, 26, 34, 65, 123, 123, 5656, 6786]);
}

#[test]
fn static_local_counter_persists_across_calls() {
    let src = r"
        void bump() {
            static int x;
            out(++x);
        }
        int main() {
            bump();
            bump();
            bump();
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![1, 2, 3]);
}

#[test]
fn unsigned_subtraction_wraps() {
    let src = r"
        int main() {
            unsigned a = 4222111000u;
            unsigned b = 3555444333u;
            out(a - b);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![666666667]);
}

#[test]
fn signed_overflow_wraps_around() {
    let src = r"
        int main() {
            int mn = -2147483647 - 1;
            int mx = 2147483647;
            out(mn + mx);
            out((-1 << 31) == mn);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![-1, 1]);
}

#[test]
fn unsigned_wraparound_on_increment_and_subtraction() {
    let src = r"
        int main() {
            unsigned mx = 4294967295u;
            out(mx + 1 == 0);
            unsigned z = 0;
            out(z - 1 == 4294967295u);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![1, 1]);
}

#[test]
fn sign_aware_division_and_shift() {
    let src = r"
        int main() {
            out(-19 % 5);
            out(13 % -3);
            out(-1 >> 31);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![-4, 1, -1]);
}

#[test]
fn logical_and_short_circuits() {
    let src = r"
        int main() {
            int x = 0;
            int r = 0 && (x = 1);
            out(r);
            out(x);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![0, 0]);
}

#[test]
fn logical_or_short_circuits() {
    let src = r"
        int main() {
            int x = 0;
            int r = 1 || (x = 1);
            out(r);
            out(x);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![1, 0]);
}

#[test]
fn postfix_increment_returns_pre_value() {
    let src = r"
        int main() {
            int a = 5;
            out(a++);
            out(a);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![5, 6]);
}

#[test]
fn pointer_identity_and_arithmetic() {
    let src = r"
        int main() {
            int a[5];
            out(&a[2] == &*&a[2]);
            out(&a[3] - &a[1]);
            out(&a[1] + 2 == &a[3]);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![1, 2, 1]);
}

#[test]
fn tentative_definition_is_zero_initialized() {
    let src = r"
        int d[20];
        int main() {
            out(d[0]);
            out(d[19]);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![0, 0]);
}

#[test]
fn extern_then_definition_unifies_to_final_value() {
    let src = r"
        extern int x;
        int use_x() { return x; }
        int x = 16;
        int main() {
            out(use_x());
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![16]);
}

#[test]
fn stack_integrity_across_a_call() {
    let src = r"
        int add(int a, int b) { return a + b; }
        int main() {
            int sentinel = 42;
            int result = add(2, 3);
            out(sentinel);
            out(result);
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![42, 5]);
}

#[test]
fn function_pointer_call_forms_agree() {
    let src = r"
        int add1(int x) { return x + 1; }
        int main() {
            int (*f)(int) = add1;
            out((*f)(10));
            out(f(10));
            out((&**&f)(10));
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![11, 11, 11]);
}

#[test]
fn array_of_function_pointers() {
    let src = r"
        int add1(int x) { return x + 1; }
        int add2(int x) { return x + 2; }
        int main() {
            int (*table[2])(int);
            table[0] = add1;
            table[1] = add2;
            out(table[0](10));
            out(table[1](10));
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![11, 12]);
}

#[test]
fn well_style_random_number_generator_state_update() {
    let src = r"
        int index = 0;
        int state[16];

        void init() {
            index = 0;
            state[0] = 1467061415;
            state[1] = 4194861102;
            state[2] = 3897720708;
            state[3] = 2937396369;
            state[4] = 64831833;
            state[5] = 1946534496;
            state[6] = 521381113;
            state[7] = 2098546553;
            state[8] = 3693568921;
            state[9] = 177665932;
            state[10] = 3806075856;
            state[11] = 2434158448;
            state[12] = 3916115660;
            state[13] = 3502103198;
            state[14] = 1922215501;
            state[15] = 3253856467;
        }

        int rnd() {
            int a;
            int b;
            int c;
            int d;
            a = state[index];
            c = state[(index + 13) & 15];
            b = a ^ c ^ (a << 16) ^ (c << 15);
            c = state[(index + 9) & 15];
            c ^= c >> 11;
            a = state[index] = b ^ c;
            d = a ^ ((a << 5) & 3661901088);
            index = (index + 15) & 15;
            a = state[index];
            state[index] = a ^ b ^ d ^ (a << 2) ^ (b << 18) ^ (c << 28);
            return state[index];
        }

        int main() {
            init();
            out(rnd());
        }
    ";
    let (out, _) = sim::run(src, &[]);
    assert_eq!(out, vec![1174520813]);
}

#[test]
fn in_reads_successive_words_from_the_input_device() {
    let src = r"
        int main() {
            int a = in();
            int b = in();
            out(a + b);
        }
    ";
    let (out, _) = sim::run(src, &[7, 35]);
    assert_eq!(out, vec![42]);
}
